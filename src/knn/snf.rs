//! Shared neighbour similarity and the secondary distance derived from it.
//!
//! Two points are similar when their kNN sets overlap. Each shared neighbour x contributes a weight w(x):
//!  - simcos    : w(x) = 1
//!  - simhubIN  : w(x) = informativeness of x, small for hubs as they are shared by many points.
//!                I(x) = ln((n + θ) / (N_k(x) + θ)) / ln((n + θ) / θ), in (0, 1]
//!  - simhubPUR : w(x) = purity of x, 1 - H(x) / ln(C) where H(x) is the label entropy of the
//!                reverse neighbours of x and C the number of classes.
//!  - simhub    : product of informativeness and purity.
//!
//! sim(i, j) = Σ_{x in kNN(i) ∩ kNN(j)} w(x) / k.
//!
//! The secondary distance is maxSim - sim(i, j) where maxSim is the largest self similarity
//! sim(i, i) = Σ_{x in kNN(i)} w(x) / k. As the shared weight of a pair cannot exceed the self
//! similarity of either point, secondary distances are non negative.
//!
//! Reference : *Hubness-aware shared neighbor distances for high-dimensional k-nearest neighbor classification.*
//! Tomasev N., Mladenic D. Knowledge and Information Systems 2014

use anyhow::anyhow;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use std::time::SystemTime;

use cpu_time::ProcessTime;
use rayon::prelude::*;

use super::nsf::NeighbourSetFinder;
use crate::distmatrix::{build_pool, split_ranges, DistanceMatrix};

/// How shared neighbours are weighted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharedWeighting {
    /// simcos, plain count of shared neighbours
    None,
    /// simhubIN
    Informativeness,
    /// simhubPUR
    Purity,
    /// simhub, informativeness times purity
    Hub,
}

impl std::str::FromStr for SharedWeighting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "simcos" => Ok(SharedWeighting::None),
            "in" | "simhubIN" => Ok(SharedWeighting::Informativeness),
            "pur" | "simhubPUR" => Ok(SharedWeighting::Purity),
            "hub" | "simhub" => Ok(SharedWeighting::Hub),
            _ => Err(anyhow!(
                "unknown weighting {}, expecting none, in, pur or hub",
                s
            )),
        }
    }
} // end of impl FromStr for SharedWeighting

/// informativeness weights, see module doc.
/// occurrences\[x\] is the occurrence of point x among n = occurrences.len() points, so it is at most n - 1.
/// Larger values are clamped to n - 1 and weights stay in (0, 1].
pub fn informativeness_weights(occurrences: &[u32], theta: f64) -> Vec<f64> {
    let n = occurrences.len() as f64;
    let max_occ = (n - 1.).max(0.);
    let norm = ((n + theta) / theta).ln();
    occurrences
        .iter()
        .map(|occ| {
            let occ = (*occ as f64).min(max_occ);
            ((n + theta) / (occ + theta)).ln() / norm
        })
        .collect()
} // end of informativeness_weights

/// purity weights from reverse neighbour label entropies, see module doc
pub fn purity_weights(reverse_entropies: &[f64], nb_classes: usize) -> Vec<f64> {
    if nb_classes <= 1 {
        return vec![1.; reverse_entropies.len()];
    }
    let max_entropy = (nb_classes as f64).ln();
    reverse_entropies
        .iter()
        .map(|h| (1. - h / max_entropy).max(0.))
        .collect()
} // end of purity_weights

pub struct SharedNeighbourFinder<'b, 'a, F> {
    nsf: &'b NeighbourSetFinder<'a, F>,
    weighting: SharedWeighting,
    /// weight of each point when it is a shared neighbour
    weights: Vec<f64>,
    /// upper triangular similarities, same layout as the distance matrix. Empty until computed.
    similarities: Vec<Vec<f64>>,
    /// upper triangular raw counts of shared neighbours
    shared_counts: Vec<Vec<u16>>,
} // end of struct SharedNeighbourFinder

impl<'b, 'a, F> SharedNeighbourFinder<'b, 'a, F>
where
    F: Float + FromPrimitive + Send + Sync,
{
    /// The shared neighbourhood size is the active k of nsf. theta must be > 0, it is used by
    /// informativeness weighting only.
    pub fn new(
        nsf: &'b NeighbourSetFinder<'a, F>,
        weighting: SharedWeighting,
        theta: f64,
    ) -> anyhow::Result<Self> {
        if nsf.get_k() == 0 {
            log::error!("SharedNeighbourFinder::new neighbour sets not computed");
            return Err(anyhow!("neighbour sets are not computed"));
        }
        if nsf.get_k() > u16::MAX as usize {
            log::error!("SharedNeighbourFinder::new shared neighbourhood size {} too large", nsf.get_k());
            return Err(anyhow!("shared neighbourhood size {} too large", nsf.get_k()));
        }
        if !(theta > 0.) || !theta.is_finite() {
            log::error!("SharedNeighbourFinder::new theta must be positive, got {}", theta);
            return Err(anyhow!("theta must be positive, got {}", theta));
        }
        let size = nsf.get_size();
        let weights = match weighting {
            SharedWeighting::None => vec![1.; size],
            SharedWeighting::Informativeness => informativeness_weights(nsf.get_occurrences(), theta),
            SharedWeighting::Purity => purity_weights(
                nsf.get_reverse_neighbour_label_entropies(),
                nsf.get_nb_classes(),
            ),
            SharedWeighting::Hub => {
                let info = informativeness_weights(nsf.get_occurrences(), theta);
                let purity = purity_weights(
                    nsf.get_reverse_neighbour_label_entropies(),
                    nsf.get_nb_classes(),
                );
                info.iter().zip(purity.iter()).map(|(i, p)| i * p).collect()
            }
        };
        log::debug!(
            "SharedNeighbourFinder k : {}, weighting : {:?}",
            nsf.get_k(),
            weighting
        );
        Ok(SharedNeighbourFinder {
            nsf,
            weighting,
            weights,
            similarities: Vec::new(),
            shared_counts: Vec::new(),
        })
    } // end of new

    pub fn get_weighting(&self) -> SharedWeighting {
        self.weighting
    }

    pub fn get_weights(&self) -> &[f64] {
        &self.weights
    }

    /// shared neighbourhood size
    pub fn get_k(&self) -> usize {
        self.nsf.get_k()
    }

    // row i of upper triangular similarities and counts
    fn compute_row(&self, i: usize, marks: &mut [bool]) -> (Vec<f64>, Vec<u16>) {
        let size = self.nsf.get_size();
        let k = self.nsf.get_k() as f64;
        let neighbours_i = self.nsf.get_neighbours_of(i);
        for n in neighbours_i.iter() {
            marks[*n] = true;
        }
        let mut sims = Vec::<f64>::with_capacity(size - i - 1);
        let mut counts = Vec::<u16>::with_capacity(size - i - 1);
        for j in i + 1..size {
            let mut sim = 0.;
            let mut count = 0u16;
            for n in self.nsf.get_neighbours_of(j).iter() {
                if marks[*n] {
                    sim += self.weights[*n];
                    count += 1;
                }
            }
            sims.push(sim / k);
            counts.push(count);
        }
        for n in neighbours_i.iter() {
            marks[*n] = false;
        }
        (sims, counts)
    } // end of compute_row

    fn store(&mut self, rows: Vec<(Vec<f64>, Vec<u16>)>) {
        let (similarities, shared_counts) = rows.into_iter().unzip();
        self.similarities = similarities;
        self.shared_counts = shared_counts;
    }

    /// computes similarities of all pairs on calling thread
    pub fn count_shared_neighbours(&mut self) {
        let size = self.nsf.get_size();
        let mut marks = vec![false; size];
        let rows: Vec<(Vec<f64>, Vec<u16>)> = (0..size).map(|i| self.compute_row(i, &mut marks)).collect();
        self.store(rows);
    } // end of count_shared_neighbours

    /// computes similarities with nb_threads workers, each one in charge of a contiguous range of rows.
    /// The result is identical to [Self::count_shared_neighbours]
    pub fn count_shared_neighbours_parallel(&mut self, nb_threads: usize) -> anyhow::Result<()> {
        let pool = build_pool(nb_threads)?;
        let cpu_start = ProcessTime::now();
        let sys_now = SystemTime::now();
        let size = self.nsf.get_size();
        let ranges = split_ranges(size, nb_threads);
        let this = &*self;
        let blocks: Vec<Vec<(Vec<f64>, Vec<u16>)>> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| {
                    let mut marks = vec![false; size];
                    range.map(|i| this.compute_row(i, &mut marks)).collect::<Vec<_>>()
                })
                .collect()
        });
        log::info!(
            "shared neighbours counted, sys time(ms) {:?}, cpu time(ms) {:?}",
            sys_now.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        self.store(blocks.into_iter().flatten().collect());
        Ok(())
    } // end of count_shared_neighbours_parallel

    fn check_computed(&self) -> anyhow::Result<()> {
        if self.similarities.is_empty() {
            return Err(anyhow!("shared neighbours are not counted"));
        }
        Ok(())
    }

    /// number of neighbours shared by i and j, k on the diagonal
    pub fn get_shared_count(&self, i: usize, j: usize) -> anyhow::Result<usize> {
        self.check_computed()?;
        let count = if i == j {
            self.get_k()
        } else if i < j {
            self.shared_counts[i][j - i - 1] as usize
        } else {
            self.shared_counts[j][i - j - 1] as usize
        };
        Ok(count)
    } // end of get_shared_count

    /// self similarity of i : weights of all its neighbours
    pub fn get_self_similarity(&self, i: usize) -> f64 {
        let sum: f64 = self
            .nsf
            .get_neighbours_of(i)
            .iter()
            .map(|n| self.weights[*n])
            .sum();
        sum / self.get_k() as f64
    }

    /// similarity between i and j, symmetric
    pub fn get_similarity(&self, i: usize, j: usize) -> anyhow::Result<f64> {
        self.check_computed()?;
        let sim = if i == j {
            self.get_self_similarity(i)
        } else if i < j {
            self.similarities[i][j - i - 1]
        } else {
            self.similarities[j][i - j - 1]
        };
        Ok(sim)
    } // end of get_similarity

    /// upper triangular similarities
    pub fn get_similarity_matrix(&self) -> anyhow::Result<&[Vec<f64>]> {
        self.check_computed()?;
        Ok(&self.similarities)
    }

    /// largest self similarity, 1. for simcos
    pub fn get_max_similarity(&self) -> f64 {
        (0..self.nsf.get_size())
            .map(|i| self.get_self_similarity(i))
            .fold(0., f64::max)
    }

    /// secondary distance matrix : maxSim - sim(i, j)
    pub fn get_secondary_distance_matrix(&self) -> anyhow::Result<DistanceMatrix<F>> {
        self.check_computed()?;
        let max_sim = self.get_max_similarity();
        log::debug!("secondary distance max similarity : {:.3e}", max_sim);
        let rows = self
            .similarities
            .iter()
            .map(|row| {
                row.iter()
                    .map(|sim| {
                        F::from_f64((max_sim - sim).max(0.))
                            .ok_or_else(|| anyhow!("cannot convert secondary distance"))
                    })
                    .collect::<anyhow::Result<Vec<F>>>()
            })
            .collect::<anyhow::Result<Vec<Vec<F>>>>()?;
        DistanceMatrix::from_rows(rows)
    } // end of get_secondary_distance_matrix
} // end of impl SharedNeighbourFinder

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test snf  -- --nocapture

    use super::*;

    use crate::dataset::Dataset;
    use crate::metric::DistL2;

    use rand::distributions::Uniform;
    use rand::prelude::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn gen_rand_data(nb_elem: usize, dim: usize, seed: u64) -> Dataset<f64> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let unif = Uniform::<f64>::new(0., 1.);
        let rows: Vec<Vec<f64>> = (0..nb_elem)
            .map(|_| (0..dim).map(|_| rng.sample(unif)).collect())
            .collect();
        let labels: Vec<usize> = (0..nb_elem).map(|_| rng.gen_range(0..3)).collect();
        Dataset::from_float_rows(rows, &labels).unwrap()
    }

    #[test]
    fn test_line_simcos() {
        log_init_test();
        let rows: Vec<Vec<f64>> = [0f64, 1., 2., 10., 11.].iter().map(|x| vec![*x]).collect();
        let data = Dataset::from_float_rows(rows, &[0, 0, 0, 1, 1]).unwrap();
        let dm = DistanceMatrix::from_dataset(&data, &DistL2).unwrap();
        let mut nsf = NeighbourSetFinder::from_dataset(&dm, &data).unwrap();
        nsf.compute_neighbour_sets(2).unwrap();
        // kNN : 0 -> {1,2}, 1 -> {0,2}, 2 -> {1,0}, 3 -> {4,2}, 4 -> {3,2}
        let mut snf = SharedNeighbourFinder::new(&nsf, SharedWeighting::None, 1.).unwrap();
        assert!(snf.get_similarity(0, 1).is_err());
        snf.count_shared_neighbours();
        assert_eq!(snf.get_shared_count(0, 1).unwrap(), 1);
        assert_eq!(snf.get_shared_count(3, 4).unwrap(), 1);
        assert_eq!(snf.get_shared_count(0, 3).unwrap(), 1);
        assert_eq!(snf.get_shared_count(2, 3).unwrap(), 0);
        assert_eq!(snf.get_shared_count(2, 2).unwrap(), 2);
        assert!((snf.get_similarity(1, 0).unwrap() - 0.5).abs() < 1.0e-12);
        assert_eq!(snf.get_max_similarity(), 1.);
        let secondary = snf.get_secondary_distance_matrix().unwrap();
        assert!((secondary.get(0, 1) - 0.5).abs() < 1.0e-12);
        assert!((secondary.get(2, 3) - 1.).abs() < 1.0e-12);
        assert_eq!(secondary.get(4, 4), 0.);
    } // end of test_line_simcos

    #[test]
    fn test_identical_neighbourhoods() {
        // 0 and 1 are far from each other but both have {2, 3} as neighbours
        let rows = vec![vec![10., 1., 1.], vec![1., 1.], vec![5.], vec![]];
        let dm = DistanceMatrix::<f64>::from_rows(rows).unwrap();
        let mut nsf = NeighbourSetFinder::new(&dm, vec![0, 0, 1, 1]).unwrap();
        nsf.compute_neighbour_sets(2).unwrap();
        assert_eq!(nsf.get_neighbours_of(0).to_vec(), vec![2, 3]);
        assert_eq!(nsf.get_neighbours_of(1).to_vec(), vec![2, 3]);
        let mut snf = SharedNeighbourFinder::new(&nsf, SharedWeighting::None, 1.).unwrap();
        snf.count_shared_neighbours();
        let secondary = snf.get_secondary_distance_matrix().unwrap();
        assert_eq!(secondary.get(0, 1), 0.);
    } // end of test_identical_neighbourhoods

    #[test]
    fn test_parallel_equals_serial() {
        log_init_test();
        let data = gen_rand_data(120, 10, 5555);
        let dm = DistanceMatrix::from_dataset(&data, &DistL2).unwrap();
        let mut nsf = NeighbourSetFinder::from_dataset(&dm, &data).unwrap();
        nsf.compute_neighbour_sets(8).unwrap();
        for weighting in [
            SharedWeighting::None,
            SharedWeighting::Informativeness,
            SharedWeighting::Purity,
            SharedWeighting::Hub,
        ] {
            let mut serial = SharedNeighbourFinder::new(&nsf, weighting, 1.).unwrap();
            serial.count_shared_neighbours();
            let mut parallel = SharedNeighbourFinder::new(&nsf, weighting, 1.).unwrap();
            parallel.count_shared_neighbours_parallel(3).unwrap();
            assert_eq!(
                serial.get_similarity_matrix().unwrap(),
                parallel.get_similarity_matrix().unwrap()
            );
            let secondary = serial.get_secondary_distance_matrix().unwrap();
            assert_eq!(secondary.get_size(), 120);
            for i in 0..120 {
                for j in 0..120 {
                    assert!(secondary.get(i, j) >= 0.);
                }
            }
        }
    } // end of test_parallel_equals_serial

    #[test]
    fn test_weights() {
        // a hub is less informative than an anti-hub
        let info = informativeness_weights(&[0, 1, 2], 1.);
        assert!((info[0] - 1.).abs() < 1.0e-12);
        assert!(info[1] > info[2]);
        assert!(info.iter().all(|w| *w > 0. && *w <= 1.));
        // n = 3 points : occurrences above 2 cannot happen, they are clamped to 2
        let clamped = informativeness_weights(&[0, 1, 10], 1.);
        assert!(clamped.iter().all(|w| *w > 0. && *w <= 1.));
        assert!((clamped[2] - info[2]).abs() < 1.0e-12);
        let purity = purity_weights(&[0., 2f64.ln()], 2);
        assert!((purity[0] - 1.).abs() < 1.0e-12);
        assert!(purity[1].abs() < 1.0e-12);
        assert_eq!(purity_weights(&[0.3], 1), vec![1.]);
        assert_eq!("simhub".parse::<SharedWeighting>().unwrap(), SharedWeighting::Hub);
        assert!("other".parse::<SharedWeighting>().is_err());
    } // end of test_weights

    #[test]
    fn test_secondary_hubness() {
        log_init_test();
        let data = gen_rand_data(200, 30, 8080);
        let dm = DistanceMatrix::from_dataset_parallel(&data, &DistL2, 4).unwrap();
        let mut nsf = NeighbourSetFinder::from_dataset(&dm, &data).unwrap();
        nsf.compute_neighbour_sets(20).unwrap();
        let mut snf = SharedNeighbourFinder::new(&nsf, SharedWeighting::Hub, 1.).unwrap();
        snf.count_shared_neighbours_parallel(4).unwrap();
        let secondary = snf.get_secondary_distance_matrix().unwrap();
        let mut nsf2 = NeighbourSetFinder::from_dataset(&secondary, &data).unwrap();
        nsf2.compute_neighbour_sets(5).unwrap();
        let total: u32 = nsf2.get_occurrences().iter().sum();
        assert_eq!(total, 200 * 5);
        assert!(SharedNeighbourFinder::new(&nsf, SharedWeighting::None, 0.).is_err());
    } // end of test_secondary_hubness
} // end of mod tests
