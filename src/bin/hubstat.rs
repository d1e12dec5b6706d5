//! hubstat binary.
//!
//! Hubness statistics of a distance matrix stored in text format (see module tools::io).
//! Command syntax is hubstat --dist distfile [--labels labelfile] [--k k] [--threads nb] [--out csvfile]
//!  [--kshared ks] [--weighting none|in|pur|hub] [--theta θ] [--secondary-out distfile]
//!
//!  --dist      : the distance matrix file
//!  --labels    : a file with one integer label by line. Without labels all points are in class 0.
//!  --k         : number of neighbours, default 10
//!  --threads   : number of workers, default to number of cpus
//!  --out       : csv file with occurrence, good and bad occurrence of each point
//!  --kshared   : neighbourhood size for shared neighbour secondary distance, default 50, 0 to skip it.
//!                clamped to number of points - 1
//!  --weighting : weighting of shared neighbours, default hub
//!  --theta     : informativeness offset, default 1.
//!  --secondary-out : dumps the secondary distance matrix in this file
//!
//! Logging is driven by RUST_LOG, for example RUST_LOG=hubminer=INFO

use std::path::Path;
use std::time::{Duration, SystemTime};

use cpu_time::ProcessTime;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use hubminer::prelude::*;

/// what is not in HubnessParams
#[derive(Debug, Clone)]
struct IoParams {
    dist_file: String,
    label_file: Option<String>,
    out_file: Option<String>,
    secondary_out: Option<String>,
}

fn parse_usize(matches: &ArgMatches, name: &str, default: usize) -> Result<usize, anyhow::Error> {
    match matches.value_of(name) {
        Some(str) => str
            .parse::<usize>()
            .map_err(|_| anyhow!("could not parse {} parameter : {}", name, str)),
        None => Ok(default),
    }
} // end of parse_usize

fn parse_hubness_cmd(matches: &ArgMatches) -> Result<(HubnessParams, IoParams), anyhow::Error> {
    log::debug!("in parse_hubness_cmd");
    //
    let mut params = HubnessParams::default();
    params.set_k(parse_usize(matches, "k", params.get_k())?);
    params.set_nb_threads(parse_usize(matches, "threads", params.get_nb_threads())?);
    params.set_k_shared(parse_usize(matches, "kshared", params.get_k_shared())?);
    if let Some(str) = matches.value_of("weighting") {
        params.set_weighting(str.parse::<SharedWeighting>()?);
    }
    if let Some(str) = matches.value_of("theta") {
        let theta = str
            .parse::<f64>()
            .map_err(|_| anyhow!("could not parse theta parameter : {}", str))?;
        params.set_theta(theta);
    }
    //
    let dist_file = match matches.value_of("distfile") {
        Some(str) if !str.is_empty() => str.to_string(),
        _ => return Err(anyhow!("a distance file is required")),
    };
    let ioparams = IoParams {
        dist_file,
        label_file: matches.value_of("labels").map(String::from),
        out_file: matches.value_of("outfile").map(String::from),
        secondary_out: matches.value_of("secondary").map(String::from),
    };
    Ok((params, ioparams))
} // end of parse_hubness_cmd

fn report(name: &str, nsf: &NeighbourSetFinder<f32>) -> Result<(), anyhow::Error> {
    let hubness = Hubness::new(nsf)?;
    let summary = hubness.get_summary()?;
    summary.log();
    println!("\n {} hubness, k = {}", name, summary.k);
    println!("\t skewness : {:.3e}, kurtosis : {:.3e}", summary.skewness, summary.kurtosis);
    println!(
        "\t hubs : {}, antihubs : {}, orphans : {}, max occurrence : {}",
        summary.nb_hubs, summary.nb_antihubs, summary.nb_orphans, summary.max_occurrence
    );
    println!("\t bad occurrence rate : {:.3e}", summary.bad_occurrence_rate);
    let _ = hubness.get_hubness_histogram()?;
    Ok(())
} // end of report

fn occurrence_records(nsf: &NeighbourSetFinder<f32>) -> Result<Vec<OccurrenceRecord>, anyhow::Error> {
    let hubness = Hubness::new(nsf)?;
    let mut is_hub = vec![false; nsf.get_size()];
    for h in hubness.get_hubs() {
        is_hub[h] = true;
    }
    (0..nsf.get_size())
        .map(|i| -> Result<OccurrenceRecord, anyhow::Error> {
            Ok(OccurrenceRecord {
                index: i,
                label: nsf.get_labels()[i],
                occurrence: nsf.get_occurrences()[i],
                good: nsf.get_good_occurrences()[i],
                bad: nsf.get_bad_occurrences()[i],
                kdistance: nsf.get_kdistance(i)? as f64,
                hub: is_hub[i],
            })
        })
        .collect()
} // end of occurrence_records

fn run(params: &HubnessParams, ioparams: &IoParams) -> Result<(), anyhow::Error> {
    let cpu_start = ProcessTime::now();
    let sys_now = SystemTime::now();
    //
    let dist_matrix = load_distance_matrix::<f32>(Path::new(&ioparams.dist_file))?;
    log::info!("distance file {} read, {} points", ioparams.dist_file, dist_matrix.get_size());
    let labels = match &ioparams.label_file {
        Some(fname) => load_labels(Path::new(fname))?,
        None => vec![0; dist_matrix.get_size()],
    };
    //
    let mut nsf = NeighbourSetFinder::new(&dist_matrix, labels.clone())?;
    nsf.compute_neighbour_sets_parallel(params.get_k(), params.get_nb_threads())?;
    report("primary", &nsf)?;
    if let Some(fname) = &ioparams.out_file {
        write_occurrence_csv(Path::new(fname), &occurrence_records(&nsf)?)?;
    }
    //
    if params.get_k_shared() > 0 {
        let k_shared = params.get_k_shared().min(dist_matrix.get_size().saturating_sub(1));
        if k_shared < params.get_k_shared() {
            log::warn!(
                "shared neighbourhood size {} reduced to {} for {} points",
                params.get_k_shared(),
                k_shared,
                dist_matrix.get_size()
            );
        }
        let mut nsf_shared = NeighbourSetFinder::new(&dist_matrix, labels.clone())?;
        nsf_shared.compute_neighbour_sets_parallel(k_shared, params.get_nb_threads())?;
        let mut snf = SharedNeighbourFinder::new(&nsf_shared, params.get_weighting(), params.get_theta())?;
        snf.count_shared_neighbours_parallel(params.get_nb_threads())?;
        let secondary = snf.get_secondary_distance_matrix()?;
        if let Some(fname) = &ioparams.secondary_out {
            dump_distance_matrix(Path::new(fname), &secondary)?;
        }
        let mut nsf_secondary = NeighbourSetFinder::new(&secondary, labels)?;
        nsf_secondary.compute_neighbour_sets_parallel(params.get_k(), params.get_nb_threads())?;
        report("secondary", &nsf_secondary)?;
    }
    //
    let cpu_time: Duration = cpu_start.elapsed();
    println!(
        " hubstat sys time(s) {:?} cpu time {:?}",
        sys_now.elapsed().map(|d| d.as_secs()).unwrap_or(0),
        cpu_time.as_secs()
    );
    Ok(())
} // end of run

fn build_command() -> Command<'static> {
    Command::new("hubstat")
        .arg_required_else_help(true)
        .arg(Arg::new("distfile")
            .long("dist")
            .takes_value(true)
            .required(true)
            .help("expecting a distance matrix file"))
        .arg(Arg::new("labels")
            .long("labels")
            .takes_value(true)
            .help("file with one label by line"))
        .arg(Arg::new("k")
            .long("k")
            .short('k')
            .takes_value(true)
            .help("number of neighbours"))
        .arg(Arg::new("threads")
            .long("threads")
            .short('t')
            .takes_value(true)
            .help("number of threads"))
        .arg(Arg::new("outfile")
            .long("out")
            .short('o')
            .takes_value(true)
            .help("expecting output csv file name"))
        .arg(Arg::new("kshared")
            .long("kshared")
            .takes_value(true)
            .help("neighbourhood size for shared neighbour distance, default 50, 0 to skip"))
        .arg(Arg::new("weighting")
            .long("weighting")
            .short('w')
            .takes_value(true)
            .help("shared neighbour weighting : \"none\", \"in\", \"pur\", \"hub\""))
        .arg(Arg::new("theta")
            .long("theta")
            .takes_value(true)
            .help("informativeness offset"))
        .arg(Arg::new("secondary")
            .long("secondary-out")
            .takes_value(true)
            .help("file to dump secondary distance matrix"))
} // end of build_command

pub fn main() {
    println!("initializing default logger from environment ...");
    env_logger::Builder::from_default_env().init();
    log::info!("logger initialized from default environment");
    //
    let matches = build_command().get_matches();
    //
    let (params, ioparams) = match parse_hubness_cmd(&matches) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::error!("parsing command failed");
            println!("exiting with error {}", e);
            std::process::exit(1);
        }
    };
    params.log();
    log::debug!("ioparams : {:?}", ioparams);
    //
    if let Err(e) = run(&params, &ioparams) {
        log::error!("hubstat failed : {}", e);
        println!("exiting with error {}", e);
        std::process::exit(1);
    }
} // end of main

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test --bin hubstat -- --nocapture

    use super::*;

    fn parse(args: &[&str]) -> Result<(HubnessParams, IoParams), anyhow::Error> {
        let matches = build_command().try_get_matches_from(args)?;
        parse_hubness_cmd(&matches)
    }

    #[test]
    fn test_defaults_follow_params() {
        let (params, ioparams) = parse(&["hubstat", "--dist", "matrix.dist"]).unwrap();
        let defaults = HubnessParams::default();
        assert_eq!(params.get_k(), defaults.get_k());
        assert_eq!(params.get_k_shared(), defaults.get_k_shared());
        assert_eq!(params.get_weighting(), defaults.get_weighting());
        assert_eq!(params.get_theta(), defaults.get_theta());
        assert_eq!(ioparams.dist_file, "matrix.dist");
        assert!(ioparams.label_file.is_none());
    } // end of test_defaults_follow_params

    #[test]
    fn test_explicit_options() {
        let args = [
            "hubstat", "--dist", "m.dist", "--k", "5", "--kshared", "0", "--weighting", "pur", "--out", "o.csv",
        ];
        let (params, ioparams) = parse(&args).unwrap();
        assert_eq!(params.get_k(), 5);
        assert_eq!(params.get_k_shared(), 0);
        assert_eq!(params.get_weighting(), SharedWeighting::Purity);
        assert_eq!(ioparams.out_file.as_deref(), Some("o.csv"));
        assert!(parse(&["hubstat", "--dist", "m.dist", "--k", "five"]).is_err());
        assert!(parse(&["hubstat", "--dist", "m.dist", "--weighting", "other"]).is_err());
        assert!(parse(&["hubstat", "--k", "5"]).is_err());
    } // end of test_explicit_options
} // end of mod tests
