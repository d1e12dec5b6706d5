//! To take charge of io of distance matrices and per point occurrence dumps.
//!
//! Distance matrix text format :
//!  - optional header lines beginning with '#' or '%'
//!  - one line with the number of points N
//!  - N-1 lines, line i holding the comma separated distances from point i to points i+1..N
//!
//! A trailing empty line (the empty last row of the matrix) is accepted.

use anyhow::anyhow;

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use serde::Serialize;

use crate::distmatrix::DistanceMatrix;

/// writes dist_matrix in text format
pub fn write_distance_matrix<F>(writer: &mut dyn Write, dist_matrix: &DistanceMatrix<F>) -> anyhow::Result<()>
where
    F: Float + FromPrimitive + Send + Sync + ToString,
{
    let size = dist_matrix.get_size();
    writeln!(writer, "{}", size)?;
    for i in 0..size.saturating_sub(1) {
        let line = dist_matrix
            .get_row(i)
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<String>>()
            .join(",");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
} // end of write_distance_matrix

/// dumps dist_matrix in file filepath, see [write_distance_matrix]
pub fn dump_distance_matrix<F>(filepath: &Path, dist_matrix: &DistanceMatrix<F>) -> anyhow::Result<()>
where
    F: Float + FromPrimitive + Send + Sync + ToString,
{
    log::debug!("dumping distance matrix in {}", filepath.display());
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(filepath)
        .map_err(|e| {
            log::error!("dump_distance_matrix could not open file {} : {}", filepath.display(), e);
            anyhow!("could not open file {} : {}", filepath.display(), e)
        })?;
    let mut bufwriter = BufWriter::new(file);
    write_distance_matrix(&mut bufwriter, dist_matrix)
} // end of dump_distance_matrix

/// reads a distance matrix in text format
pub fn read_distance_matrix<F, R>(reader: R) -> anyhow::Result<DistanceMatrix<F>>
where
    F: Float + FromPrimitive + Send + Sync + FromStr,
    R: BufRead,
{
    let mut lines = reader.lines().enumerate();
    // skip header lines
    let size: usize = loop {
        match lines.next() {
            Some((num, line)) => {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.starts_with('#') || trimmed.starts_with('%') {
                    continue;
                }
                break trimmed.parse::<usize>().map_err(|_| {
                    log::error!("line {} : could not decode number of points {:?}", num + 1, trimmed);
                    anyhow!("line {} : could not decode number of points {:?}", num + 1, trimmed)
                })?;
            }
            None => {
                log::error!("read_distance_matrix no number of points found");
                return Err(anyhow!("no number of points found"));
            }
        }
    };
    log::debug!("read_distance_matrix, number of points {}", size);
    //
    // size is not trusted before rows are read
    let mut rows = Vec::<Vec<F>>::new();
    for (num, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if rows.len() == size.saturating_sub(1) {
            if trimmed.is_empty() {
                continue;
            }
            log::error!("line {} : more rows than expected for {} points", num + 1, size);
            return Err(anyhow!("line {} : more rows than expected for {} points", num + 1, size));
        }
        let expected = size - rows.len() - 1;
        let row = trimmed
            .split(',')
            .map(|field| {
                field.trim().parse::<F>().map_err(|_| {
                    log::error!("line {} : error decoding field {:?}", num + 1, field);
                    anyhow!("line {} : error decoding field {:?}", num + 1, field)
                })
            })
            .collect::<anyhow::Result<Vec<F>>>()?;
        if row.len() != expected {
            log::error!("line {} : got {} distances, expected {}", num + 1, row.len(), expected);
            return Err(anyhow!(
                "line {} : got {} distances, expected {}",
                num + 1,
                row.len(),
                expected
            ));
        }
        rows.push(row);
    }
    if rows.len() != size.saturating_sub(1) {
        log::error!("read_distance_matrix got {} rows, expected {}", rows.len(), size.saturating_sub(1));
        return Err(anyhow!(
            "got {} rows of distances, expected {}",
            rows.len(),
            size.saturating_sub(1)
        ));
    }
    // last row is empty
    if size > 0 {
        rows.push(Vec::new());
    }
    DistanceMatrix::from_rows(rows)
} // end of read_distance_matrix

/// loads a distance matrix from file filepath, see [read_distance_matrix]
pub fn load_distance_matrix<F>(filepath: &Path) -> anyhow::Result<DistanceMatrix<F>>
where
    F: Float + FromPrimitive + Send + Sync + FromStr,
{
    let file = OpenOptions::new().read(true).open(filepath).map_err(|e| {
        log::error!("load_distance_matrix could not open file {:?}", filepath.as_os_str());
        anyhow!("could not open file {} : {}", filepath.display(), e)
    })?;
    read_distance_matrix(BufReader::new(file))
} // end of load_distance_matrix

/// reads one integer label per line, empty lines and lines beginning with '#' are skipped
pub fn load_labels(filepath: &Path) -> anyhow::Result<Vec<usize>> {
    let file = OpenOptions::new().read(true).open(filepath).map_err(|e| {
        log::error!("load_labels could not open file {:?}", filepath.as_os_str());
        anyhow!("could not open file {} : {}", filepath.display(), e)
    })?;
    let mut labels = Vec::<usize>::new();
    for (num, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let label = trimmed
            .parse::<usize>()
            .map_err(|_| anyhow!("line {} : could not decode label {:?}", num + 1, trimmed))?;
        labels.push(label);
    }
    Ok(labels)
} // end of load_labels

//========================================================================================

/// One line of the per point dump
#[derive(Clone, Debug, Serialize)]
pub struct OccurrenceRecord {
    pub index: usize,
    pub label: usize,
    pub occurrence: u32,
    pub good: u32,
    pub bad: u32,
    pub kdistance: f64,
    pub hub: bool,
}

/// dumps per point occurrence records in a csv file with header
pub fn write_occurrence_csv(filepath: &Path, records: &[OccurrenceRecord]) -> anyhow::Result<()> {
    log::info!("dumping occurrences in csv file {}", filepath.display());
    let mut csv_w = csv::Writer::from_path(filepath)?;
    for record in records {
        csv_w.serialize(record)?;
    }
    csv_w.flush()?;
    Ok(())
} // end of write_occurrence_csv

//========================================================================================

// end of mod tests
