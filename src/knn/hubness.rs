//! Estimate how many times each point is in neighbours of some point.
//!
//! This is referred to as hubness of data.
//! It is shown to be correlated to intrinsic dimension of data.
//!
//! A Reference on hubness is:
//! **Hubs in Space: Popular Nearest Neighbours in High Dimensional Data**
//! *Radovanovic M., Nanopoulos A., Ivanovic I.. Journal Machine Learning 2010*
//! Cf [Hubs](https://www.jmlr.org/papers/volume11/radovanovic10a/radovanovic10a.pdf)
//!

use anyhow::anyhow;

use rayon::prelude::*;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use hdrhistogram::Histogram;
use indxvec::{Indices, Vecops};
use quantiles::ckms::CKMS;

use serde::Serialize;

use super::nsf::NeighbourSetFinder;
use crate::distmatrix::{build_pool, split_ranges};
use crate::tools::stats;

/// Summary of hubness statistics for a given k.
#[derive(Clone, Debug, Serialize)]
pub struct HubnessSummary {
    pub k: usize,
    pub nb_points: usize,
    pub mean: f64,
    pub stdev: f64,
    /// standardized third moment of occurrences
    pub skewness: f64,
    /// excess kurtosis of occurrences
    pub kurtosis: f64,
    pub nb_hubs: usize,
    pub nb_antihubs: usize,
    pub nb_orphans: usize,
    pub max_occurrence: u32,
    pub bad_occurrence_rate: f64,
} // end of struct HubnessSummary

impl HubnessSummary {
    pub fn log(&self) {
        log::info!("HubnessSummary");
        log::info!("\t k : {}, nb points : {}", self.k, self.nb_points);
        log::info!("\t mean occurrence : {:.3e}, stdev : {:.3e}", self.mean, self.stdev);
        log::info!("\t skewness : {:.3e}", self.skewness);
        log::info!("\t kurtosis : {:.3e}", self.kurtosis);
        log::info!(
            "\t hubs : {}, antihubs : {}, orphans : {}",
            self.nb_hubs,
            self.nb_antihubs,
            self.nb_orphans
        );
        log::info!("\t max occurrence : {}", self.max_occurrence);
        log::info!("\t bad occurrence rate : {:.3e}", self.bad_occurrence_rate);
    }
} // end of impl HubnessSummary

//====================================================================================

pub struct Hubness<'b, 'a, F> {
    /// The finder we work for
    nsf: &'b NeighbourSetFinder<'a, F>,
    /// citation count in neighbourhoods for each point, as f64.
    counts: Vec<f64>,
} // end of Hubness

impl<'b, 'a, F> Hubness<'b, 'a, F>
where
    F: FromPrimitive + Float + Sync + Send,
{
    /// statistics refer to the active k of the finder
    pub fn new(nsf: &'b NeighbourSetFinder<'a, F>) -> anyhow::Result<Self> {
        if nsf.get_k() == 0 {
            log::error!("Hubness::new neighbour sets not computed");
            return Err(anyhow!("neighbour sets are not computed"));
        }
        let counts = stats::to_f64_vec(nsf.get_occurrences());
        Ok(Hubness { nsf, counts })
    } // end of new

    /// returns counts by index
    pub fn get_counts(&self) -> &[u32] {
        self.nsf.get_occurrences()
    }

    /// mean occurrence. Equals k
    pub fn get_mean(&self) -> f64 {
        stats::mean(&self.counts)
    }

    pub fn get_stdev(&self) -> f64 {
        stats::stdev(&self.counts)
    }

    /// get standardized 3 moment of occurences (See Radovanovic paper cited above)
    /// [Hubs](https://www.jmlr.org/papers/volume11/radovanovic10a/radovanovic10a.pdf)
    pub fn get_standard3m(&self) -> f64 {
        stats::skewness(&self.counts)
    }

    /// excess kurtosis of occurrences
    pub fn get_standard4m(&self) -> f64 {
        stats::kurtosis(&self.counts)
    }

    // points whose occurrence satisfies pred
    fn select(&self, pred: impl Fn(f64) -> bool) -> Vec<usize> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(**c))
            .map(|(i, _)| i)
            .collect()
    }

    /// points with occurrence above mean + 2 * stdev
    pub fn get_hubs(&self) -> Vec<usize> {
        let threshold = self.get_mean() + 2. * self.get_stdev();
        self.select(|c| c > threshold)
    }

    /// points with occurrence below mean - 2 * stdev
    pub fn get_antihubs(&self) -> Vec<usize> {
        let threshold = self.get_mean() - 2. * self.get_stdev();
        self.select(|c| c < threshold)
    }

    /// points that are never a neighbour
    pub fn get_orphans(&self) -> Vec<usize> {
        self.select(|c| c == 0.)
    }

    /// get an histogram of hubness counts and logs histogram summary
    /// quantiles for which thresholds are given are :
    /// 0.1, 0.25, 0.5, 0.75, 0.9 , 0.99, 0.999, 0.9999
    pub fn get_hubness_histogram(&self) -> anyhow::Result<Histogram<u32>> {
        let counts = self.get_counts();
        let max_count = counts.iter().max().copied().unwrap_or(0) as u64;
        // lowest value arg in init must be >= 1 and high >= 2 * low
        let max_value = max_count.max(2);
        let mut histo = Histogram::<u32>::new_with_bounds(1, max_value, 1).map_err(|e| {
            log::error!(
                "hubness::get_hubness_histogram, could not create histogram , error : {:?}",
                e
            );
            anyhow!("histogram construction failed")
        })?;
        for v in counts {
            histo.record(*v as u64)?;
        }
        let quantiles = vec![0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999, 0.9999];
        let thresholds = quantiles
            .iter()
            .map(|f| histo.value_at_quantile(*f))
            .collect::<Vec<u64>>();
        //
        log::info!("hubness quantiles : {:?}", quantiles);
        log::info!("thresholds : {:?}", thresholds);
        //
        Ok(histo)
    } // end of get_hubness_histogram

    /// get the index and count of the first_asked points having largest hubness, by decreasing count
    pub fn get_largest_hubs(&self, first_asked: usize) -> Vec<(usize, u32)> {
        let counts = self.get_counts();
        let first = first_asked.min(counts.len());
        // we must get index of first largest counts, get descending order
        let ranks = counts.rank(false);
        let index = ranks.invindex();
        //
        let hubs: Vec<(usize, u32)> = index
            .iter()
            .take(first)
            .map(|i| (*i, counts[*i]))
            .collect();
        for (rank, (i, count)) in hubs.iter().enumerate().take(10) {
            log::debug!("rank : {} , index : {}, count : {}", rank, i, count);
        }
        hubs
    } // end of get_largest_hubs

    /// density index of each point : inverse of distance to its k-th neighbour
    pub fn get_density_index(&self) -> Vec<f64> {
        self.nsf
            .get_kdistances()
            .outer_iter()
            .map(|row| {
                let kdist = row[row.len() - 1].to_f64().unwrap_or(0.);
                if kdist > 0. {
                    kdist.recip()
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    } // end of get_density_index

    /// for each point, the number of other points at distance <= radius.
    /// Scans the whole distance matrix, rows are processed by nb_threads workers.
    pub fn get_density_by_radius(&self, radius: F, nb_threads: usize) -> anyhow::Result<Vec<u32>> {
        let pool = build_pool(nb_threads)?;
        let dist_matrix = self.nsf.get_distance_matrix();
        let size = dist_matrix.get_size();
        let blocks: Vec<Vec<u32>> = pool.install(|| {
            split_ranges(size, nb_threads)
                .into_par_iter()
                .map(|range| {
                    range
                        .map(|i| {
                            (0..size)
                                .filter(|j| *j != i && dist_matrix.get(i, *j) <= radius)
                                .count() as u32
                        })
                        .collect::<Vec<u32>>()
                })
                .collect()
        });
        Ok(blocks.into_iter().flatten().collect())
    } // end of get_density_by_radius

    /// radius of k-neighbourhoods at quantile frac in \[0, 1\].
    pub fn get_radius_at_quantile(&self, frac: f64) -> anyhow::Result<f32> {
        if !(0. ..=1.).contains(&frac) {
            return Err(anyhow!("quantile {} not in [0, 1]", frac));
        }
        let mut quant = CKMS::<f32>::new(0.001);
        for row in self.nsf.get_kdistances().outer_iter() {
            quant.insert(row[row.len() - 1].to_f32().unwrap_or(0.));
        }
        match quant.query(frac) {
            Some((_, radius)) => Ok(radius),
            None => Err(anyhow!("no radius recorded")),
        }
    } // end of get_radius_at_quantile

    /// Pearson correlation between occurrences and some quantity attached to points
    /// (norm, local density ...)
    pub fn get_correlation_with(&self, aux: &[f64]) -> anyhow::Result<f64> {
        if aux.len() != self.counts.len() {
            log::error!(
                "get_correlation_with got {} values for {} points",
                aux.len(),
                self.counts.len()
            );
        }
        stats::pearson_correlation(&self.counts, aux)
    }

    /// correlation between occurrences and density index
    pub fn get_density_correlation(&self) -> anyhow::Result<f64> {
        // a null k-distance gives an infinite density, we cap it at the largest finite one
        let mut density = self.get_density_index();
        let max_finite = density
            .iter()
            .filter(|d| d.is_finite())
            .fold(0f64, |acc, d| acc.max(*d));
        density.iter_mut().filter(|d| !d.is_finite()).for_each(|d| *d = max_finite);
        self.get_correlation_with(&density)
    }

    pub fn get_summary(&self) -> anyhow::Result<HubnessSummary> {
        Ok(HubnessSummary {
            k: self.nsf.get_k(),
            nb_points: self.counts.len(),
            mean: self.get_mean(),
            stdev: self.get_stdev(),
            skewness: self.get_standard3m(),
            kurtosis: self.get_standard4m(),
            nb_hubs: self.get_hubs().len(),
            nb_antihubs: self.get_antihubs().len(),
            nb_orphans: self.get_orphans().len(),
            max_occurrence: self.get_counts().iter().max().copied().unwrap_or(0),
            bad_occurrence_rate: self.nsf.get_bad_occurrence_rate()?,
        })
    } // end of get_summary
} // end of impl block for Hubness

//========================================================================================

// end of mod tests
