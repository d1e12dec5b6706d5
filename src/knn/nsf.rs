//! Exact k-nearest neighbour sets and occurrence statistics computed from a [DistanceMatrix].
//!
//! For each point we keep its k nearest neighbours sorted by increasing distance, selected by bounded
//! insertion (no full sort of a row). From the kNN sets we derive:
//!  - occurrences : how many times each point is among the k nearest neighbours of other points,
//!  - good and bad occurrences : the occurrences split according to whether the point has
//!    the same label as the point citing it,
//!  - reverse neighbours : for each point the (sorted) list of points citing it,
//!  - label entropies of neighbourhoods and of reverse neighbourhoods.
//!
//! Statistics for a smaller k' can be recomputed from the first k' columns of the kNN matrix
//! without looking at distances again, see [NeighbourSetFinder::recompute_stats_for_smaller_k].
//!
//! Among equal distances the point with lower index is kept first.

use anyhow::anyhow;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use ndarray::{s, Array2, ArrayView1, ArrayView2};

use rand::distributions::Distribution;
use rand::thread_rng;

use std::time::SystemTime;

use cpu_time::ProcessTime;
use rayon::prelude::*;

use super::edge::{KBest, NodeIdx, OutEdge};
use crate::dataset::Dataset;
use crate::distmatrix::{build_pool, split_ranges, DistanceMatrix};
use crate::tools::{dimension::intrinsic_dimension_from_edges, stats};

/// labels must be below this bound, class indexed buffers are allocated from the largest label
pub const MAX_NB_CLASSES: usize = 1 << 16;

// label entropy of points, resets the class_counts entries it touched
fn label_entropy<'b>(
    labels: &[usize],
    points: impl Iterator<Item = &'b NodeIdx> + Clone,
    class_counts: &mut [u32],
) -> f64 {
    let mut total = 0u32;
    for p in points.clone() {
        class_counts[labels[*p]] += 1;
        total += 1;
    }
    let mut entropy = 0.;
    for p in points {
        let count = &mut class_counts[labels[*p]];
        if *count > 0 {
            let proba = *count as f64 / total as f64;
            entropy -= proba * proba.ln();
            *count = 0;
        }
    }
    entropy
} // end of label_entropy

/// selects the k nearest neighbours of point i. Candidates are scanned by increasing index.
fn select_neighbours<F>(dist_matrix: &DistanceMatrix<F>, i: usize, k: usize) -> Vec<OutEdge<F>>
where
    F: Float + FromPrimitive + Send + Sync,
{
    let mut best = KBest::<F>::new(k);
    for j in 0..dist_matrix.get_size() {
        if j != i {
            best.insert(j, dist_matrix.get(i, j));
        }
    }
    best.into_edges()
} // end of select_neighbours

pub struct NeighbourSetFinder<'a, F> {
    /// The distance matrix we work on
    dist_matrix: &'a DistanceMatrix<F>,
    labels: Vec<usize>,
    nb_classes: usize,
    /// active number of neighbours, the one statistics are computed for. 0 if nothing computed.
    k: usize,
    /// kneighbours\[\[i, c\]\] is the c-th nearest neighbour of i. Has as many columns as k asked at computation.
    kneighbours: Array2<NodeIdx>,
    /// kdistances\[\[i, c\]\] distance from i to kneighbours\[\[i, c\]\]
    kdistances: Array2<F>,
    occurrences: Vec<u32>,
    good_occurrences: Vec<u32>,
    bad_occurrences: Vec<u32>,
    reverse_neighbours: Vec<Vec<NodeIdx>>,
    neighbour_entropies: Vec<f64>,
    reverse_entropies: Vec<f64>,
} // end of struct NeighbourSetFinder

impl<'a, F> NeighbourSetFinder<'a, F>
where
    F: Float + FromPrimitive + Send + Sync,
{
    /// labels\[i\] is the class of point i
    pub fn new(dist_matrix: &'a DistanceMatrix<F>, labels: Vec<usize>) -> anyhow::Result<Self> {
        let size = dist_matrix.get_size();
        if size == 0 {
            log::error!("NeighbourSetFinder::new empty distance matrix");
            return Err(anyhow!("empty distance matrix"));
        }
        if labels.len() != size {
            log::error!(
                "NeighbourSetFinder::new got {} labels for {} points",
                labels.len(),
                size
            );
            return Err(anyhow!(
                "number of labels {} differs from distance matrix size {}",
                labels.len(),
                size
            ));
        }
        let nb_classes = labels.iter().map(|l| l.saturating_add(1)).max().unwrap_or(0);
        if nb_classes > MAX_NB_CLASSES {
            log::error!(
                "NeighbourSetFinder::new largest label {} is above bound {}",
                nb_classes - 1,
                MAX_NB_CLASSES - 1
            );
            return Err(anyhow!(
                "labels must be less than {}, got {}",
                MAX_NB_CLASSES,
                nb_classes - 1
            ));
        }
        Ok(NeighbourSetFinder {
            dist_matrix,
            labels,
            nb_classes,
            k: 0,
            kneighbours: Array2::<NodeIdx>::zeros((size, 0)),
            kdistances: Array2::<F>::zeros((size, 0)),
            occurrences: Vec::new(),
            good_occurrences: Vec::new(),
            bad_occurrences: Vec::new(),
            reverse_neighbours: Vec::new(),
            neighbour_entropies: Vec::new(),
            reverse_entropies: Vec::new(),
        })
    } // end of new

    /// labels are taken from the dataset the matrix was computed from
    pub fn from_dataset(dist_matrix: &'a DistanceMatrix<F>, data: &Dataset<F>) -> anyhow::Result<Self> {
        Self::new(dist_matrix, data.get_labels())
    }

    fn check_k(&self, k: usize) -> anyhow::Result<()> {
        let size = self.dist_matrix.get_size();
        if k == 0 || k >= size {
            log::error!("asked k = {} for {} points", k, size);
            return Err(anyhow!(
                "k = {} must satisfy 0 < k < number of points {}",
                k,
                size
            ));
        }
        Ok(())
    } // end of check_k

    fn check_computed(&self) -> anyhow::Result<()> {
        if self.k == 0 {
            return Err(anyhow!("neighbour sets are not computed"));
        }
        Ok(())
    }

    /// computes the k nearest neighbours of all points on the calling thread, then occurrence statistics.
    pub fn compute_neighbour_sets(&mut self, k: usize) -> anyhow::Result<()> {
        log::trace!("entering compute_neighbour_sets k : {}", k);
        self.check_k(k)?;
        let dist_matrix = self.dist_matrix;
        let rows: Vec<Vec<OutEdge<F>>> = (0..dist_matrix.get_size())
            .map(|i| select_neighbours(dist_matrix, i, k))
            .collect();
        self.store_neighbours(rows, k);
        Ok(())
    } // end of compute_neighbour_sets

    /// computes the k nearest neighbours with nb_threads workers, each one in charge of a contiguous
    /// range of points. Statistics are aggregated in one pass once all workers are done, so the
    /// result is identical to [Self::compute_neighbour_sets].
    pub fn compute_neighbour_sets_parallel(&mut self, k: usize, nb_threads: usize) -> anyhow::Result<()> {
        log::trace!(
            "entering compute_neighbour_sets_parallel k : {}, nb_threads : {}",
            k,
            nb_threads
        );
        self.check_k(k)?;
        let pool = build_pool(nb_threads)?;
        let cpu_start = ProcessTime::now();
        let sys_now = SystemTime::now();
        //
        let dist_matrix = self.dist_matrix;
        let ranges = split_ranges(dist_matrix.get_size(), nb_threads);
        let blocks: Vec<Vec<Vec<OutEdge<F>>>> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| {
                    range
                        .map(|i| select_neighbours(dist_matrix, i, k))
                        .collect::<Vec<Vec<OutEdge<F>>>>()
                })
                .collect()
        });
        let rows: Vec<Vec<OutEdge<F>>> = blocks.into_iter().flatten().collect();
        log::info!(
            "kNN sets computed for k = {}, sys time(ms) {:?}, cpu time(ms) {:?}",
            k,
            sys_now.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        self.store_neighbours(rows, k);
        Ok(())
    } // end of compute_neighbour_sets_parallel

    // transfer selected edges in arrays and compute statistics for k
    fn store_neighbours(&mut self, rows: Vec<Vec<OutEdge<F>>>, k: usize) {
        let size = rows.len();
        let mut kneighbours = Array2::<NodeIdx>::zeros((size, k));
        let mut kdistances = Array2::<F>::zeros((size, k));
        for (i, edges) in rows.iter().enumerate() {
            // k < size so every point has exactly k candidates
            assert_eq!(edges.len(), k);
            for (c, edge) in edges.iter().enumerate() {
                kneighbours[[i, c]] = edge.node;
                kdistances[[i, c]] = edge.weight;
            }
        }
        self.kneighbours = kneighbours;
        self.kdistances = kdistances;
        self.compute_stats(k);
    } // end of store_neighbours

    // derives all statistics from the first k columns of kneighbours
    fn compute_stats(&mut self, k: usize) {
        let size = self.kneighbours.nrows();
        let mut occurrences = vec![0u32; size];
        let mut good_occurrences = vec![0u32; size];
        let mut bad_occurrences = vec![0u32; size];
        let mut reverse_neighbours: Vec<Vec<NodeIdx>> = (0..size).map(|_| Vec::new()).collect();
        let mut neighbour_entropies = Vec::<f64>::with_capacity(size);
        // entries are reset by label_entropy, work is proportional to k, not to the number of classes
        let mut class_counts = vec![0u32; self.nb_classes];
        // scanning i in increasing order keeps reverse lists sorted
        for i in 0..size {
            let neighbours = self.kneighbours.slice(s![i, ..k]);
            for n in neighbours.iter() {
                occurrences[*n] += 1;
                if self.labels[*n] == self.labels[i] {
                    good_occurrences[*n] += 1;
                } else {
                    bad_occurrences[*n] += 1;
                }
                reverse_neighbours[*n].push(i);
            }
            neighbour_entropies.push(label_entropy(&self.labels, neighbours.iter(), &mut class_counts));
        }
        let reverse_entropies = reverse_neighbours
            .iter()
            .map(|reverse| label_entropy(&self.labels, reverse.iter(), &mut class_counts))
            .collect();
        //
        let max_occurrence = occurrences.iter().max().copied().unwrap_or(0);
        let nb_bad: u64 = bad_occurrences.iter().map(|b| *b as u64).sum();
        log::info!(
            "occurrence statistics for k = {} : max occurrence {}, bad occurrence rate {:.3e}",
            k,
            max_occurrence,
            nb_bad as f64 / (size * k) as f64
        );
        //
        self.k = k;
        self.occurrences = occurrences;
        self.good_occurrences = good_occurrences;
        self.bad_occurrences = bad_occurrences;
        self.reverse_neighbours = reverse_neighbours;
        self.neighbour_entropies = neighbour_entropies;
        self.reverse_entropies = reverse_entropies;
    } // end of compute_stats

    /// recomputes statistics for k_small <= computed k from the first k_small columns of the kNN matrix.
    /// No distance is accessed and no selection is done. The kNN matrix is kept whole so
    /// statistics can be recomputed later for any k up to the computed one.
    pub fn recompute_stats_for_smaller_k(&mut self, k_small: usize) -> anyhow::Result<()> {
        self.check_computed()?;
        let computed_k = self.get_computed_k();
        if k_small == 0 || k_small > computed_k {
            log::error!(
                "recompute_stats_for_smaller_k asked {}, computed k is {}",
                k_small,
                computed_k
            );
            return Err(anyhow!(
                "k = {} must satisfy 0 < k <= computed k {}",
                k_small,
                computed_k
            ));
        }
        self.compute_stats(k_small);
        Ok(())
    } // end of recompute_stats_for_smaller_k

    /// returns a new finder whose kNN arrays are restricted to the first k_small columns
    pub fn get_sub_finder(&self, k_small: usize) -> anyhow::Result<NeighbourSetFinder<'a, F>> {
        self.check_computed()?;
        if k_small == 0 || k_small > self.get_computed_k() {
            return Err(anyhow!(
                "k = {} must satisfy 0 < k <= computed k {}",
                k_small,
                self.get_computed_k()
            ));
        }
        let mut sub = NeighbourSetFinder::new(self.dist_matrix, self.labels.clone())?;
        sub.kneighbours = self.kneighbours.slice(s![.., ..k_small]).to_owned();
        sub.kdistances = self.kdistances.slice(s![.., ..k_small]).to_owned();
        sub.compute_stats(k_small);
        Ok(sub)
    } // end of get_sub_finder

    /// active k : the one statistics refer to
    pub fn get_k(&self) -> usize {
        self.k
    }

    /// number of neighbours computed, >= active k
    pub fn get_computed_k(&self) -> usize {
        self.kneighbours.ncols()
    }

    pub fn get_size(&self) -> usize {
        self.dist_matrix.get_size()
    }

    pub fn get_distance_matrix(&self) -> &'a DistanceMatrix<F> {
        self.dist_matrix
    }

    pub fn get_labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn get_nb_classes(&self) -> usize {
        self.nb_classes
    }

    /// kNN indexes restricted to active k, one row by point
    pub fn get_kneighbours(&self) -> ArrayView2<NodeIdx> {
        self.kneighbours.slice(s![.., ..self.k])
    }

    /// distances to kNN restricted to active k, one row by point
    pub fn get_kdistances(&self) -> ArrayView2<F> {
        self.kdistances.slice(s![.., ..self.k])
    }

    /// neighbours of point i (active k), by increasing distance
    pub fn get_neighbours_of(&self, i: usize) -> ArrayView1<NodeIdx> {
        self.kneighbours.slice(s![i, ..self.k])
    }

    /// edges from point i to its neighbours (active k)
    pub fn get_edges_of(&self, i: usize) -> Vec<OutEdge<F>> {
        (0..self.k)
            .map(|c| OutEdge::new(self.kneighbours[[i, c]], self.kdistances[[i, c]]))
            .collect()
    }

    /// distance from i to its k-th nearest neighbour (active k)
    pub fn get_kdistance(&self, i: usize) -> anyhow::Result<F> {
        self.check_computed()?;
        Ok(self.kdistances[[i, self.k - 1]])
    }

    /// occurrence count of each point. Empty if nothing is computed
    pub fn get_occurrences(&self) -> &[u32] {
        &self.occurrences
    }

    pub fn get_good_occurrences(&self) -> &[u32] {
        &self.good_occurrences
    }

    pub fn get_bad_occurrences(&self) -> &[u32] {
        &self.bad_occurrences
    }

    pub fn get_reverse_neighbours(&self) -> &[Vec<NodeIdx>] {
        &self.reverse_neighbours
    }

    /// points having i among their k nearest neighbours, increasing order
    pub fn get_reverse_neighbours_of(&self, i: usize) -> &[NodeIdx] {
        &self.reverse_neighbours[i]
    }

    /// entropy of labels among the k neighbours of each point
    pub fn get_neighbour_label_entropies(&self) -> &[f64] {
        &self.neighbour_entropies
    }

    /// entropy of labels among the reverse neighbours of each point, 0. for a point never cited
    pub fn get_reverse_neighbour_label_entropies(&self) -> &[f64] {
        &self.reverse_entropies
    }

    /// class conditional occurrences : \[\[i, c\]\] counts the points of class c having i as neighbour
    pub fn get_class_occurrences(&self) -> anyhow::Result<Array2<u32>> {
        self.check_computed()?;
        let mut class_occ = Array2::<u32>::zeros((self.get_size(), self.nb_classes));
        for (i, reverse) in self.reverse_neighbours.iter().enumerate() {
            for r in reverse {
                class_occ[[i, self.labels[*r]]] += 1;
            }
        }
        Ok(class_occ)
    } // end of get_class_occurrences

    /// fraction of all neighbour occurrences that are bad
    pub fn get_bad_occurrence_rate(&self) -> anyhow::Result<f64> {
        self.check_computed()?;
        let nb_bad: u64 = self.bad_occurrences.iter().map(|b| *b as u64).sum();
        Ok(nb_bad as f64 / (self.get_size() * self.k) as f64)
    }

    /// estimate intrinsic dimension around point i from its kNN distances (active k).
    /// See [intrinsic_dimension_from_edges]
    pub fn intrinsic_dim_at(&self, i: usize) -> anyhow::Result<f64> {
        self.check_computed()?;
        intrinsic_dimension_from_edges(&self.get_edges_of(i))
    }

    /// We estimate dimension by sampling sampling_size points around which we estimate intrinsic
    /// dimension and returns mean and standard deviation if we do not encounter error.
    ///
    /// **Note : the estimation needs more than 20 neighbours around each point to be robust.**
    pub fn estimate_intrinsic_dim(&self, sampling_size: usize) -> anyhow::Result<(f64, f64)> {
        self.check_computed()?;
        // we sample points, ignoring the probability to sample twice or more the same point.
        let mut rng = thread_rng();
        let between = rand_distr::Uniform::from(0..self.get_size());
        let dims: Vec<f64> = (0..sampling_size)
            .filter_map(|_| self.intrinsic_dim_at(between.sample(&mut rng)).ok())
            .collect();
        if dims.is_empty() {
            log::error!("could not sample dimension");
            return Err(anyhow!("could not sample points"));
        }
        let mean_dim = stats::mean(&dims);
        let sigma = stats::stdev(&dims);
        log::debug!(
            " mean dimension : {:.3e}, sigma : {:.3e}, nb_points used: {}",
            mean_dim,
            sigma,
            dims.len()
        );
        Ok((mean_dim, sigma))
    } // end of estimate_intrinsic_dim
} // end of impl NeighbourSetFinder

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test nsf  -- --nocapture
    //    RUST_LOG=hubminer::knn=TRACE cargo test nsf -- --nocapture

    use super::*;

    use crate::metric::DistL2;

    use rand::distributions::Uniform;
    use rand::prelude::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn line_matrix() -> DistanceMatrix<f32> {
        let rows: Vec<Vec<f32>> = [0f32, 1., 2., 10., 11.].iter().map(|x| vec![*x]).collect();
        let data = Dataset::from_float_rows(rows, &[0, 0, 0, 1, 1]).unwrap();
        DistanceMatrix::from_dataset(&data, &DistL2).unwrap()
    }

    fn gen_rand_matrix(nb_elem: usize, dim: usize, seed: u64) -> (DistanceMatrix<f32>, Vec<usize>) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let unif = Uniform::<f32>::new(0., 1.);
        let rows: Vec<Vec<f32>> = (0..nb_elem)
            .map(|_| (0..dim).map(|_| rng.sample(unif)).collect())
            .collect();
        let labels: Vec<usize> = (0..nb_elem).map(|_| rng.gen_range(0..3)).collect();
        let data = Dataset::from_float_rows(rows, &labels).unwrap();
        (DistanceMatrix::from_dataset(&data, &DistL2).unwrap(), labels)
    }

    #[test]
    fn test_line_fixture() {
        log_init_test();
        let dm = line_matrix();
        let mut nsf = NeighbourSetFinder::new(&dm, vec![0, 0, 0, 1, 1]).unwrap();
        nsf.compute_neighbour_sets(2).unwrap();
        let expected = [[1, 2], [0, 2], [1, 0], [4, 2], [3, 2]];
        for (i, row) in expected.iter().enumerate() {
            assert_eq!(nsf.get_neighbours_of(i).to_vec(), row.to_vec(), "point {}", i);
        }
        assert_eq!(nsf.get_kdistances()[[3, 1]], 8.);
        assert_eq!(nsf.get_occurrences(), &[2, 2, 4, 1, 1]);
        assert_eq!(nsf.get_good_occurrences(), &[2, 2, 2, 1, 1]);
        assert_eq!(nsf.get_bad_occurrences(), &[0, 0, 2, 0, 0]);
        assert_eq!(nsf.get_reverse_neighbours_of(2), &[0, 1, 3, 4]);
        assert_eq!(nsf.get_kdistance(0).unwrap(), 2.);
        assert!((nsf.get_bad_occurrence_rate().unwrap() - 0.2).abs() < 1.0e-10);
        // point 3 has neighbours 4 (class 1) and 2 (class 0)
        assert!((nsf.get_neighbour_label_entropies()[3] - 2f64.ln()).abs() < 1.0e-10);
        assert_eq!(nsf.get_neighbour_label_entropies()[0], 0.);
        let class_occ = nsf.get_class_occurrences().unwrap();
        assert_eq!(class_occ[[2, 0]], 2);
        assert_eq!(class_occ[[2, 1]], 2);
    } // end of test_line_fixture

    #[test]
    fn test_invalid_k() {
        let dm = line_matrix();
        let mut nsf = NeighbourSetFinder::new(&dm, vec![0; 5]).unwrap();
        assert!(nsf.get_bad_occurrence_rate().is_err());
        assert!(nsf.recompute_stats_for_smaller_k(1).is_err());
        assert!(nsf.compute_neighbour_sets(0).is_err());
        assert!(nsf.compute_neighbour_sets(5).is_err());
        assert!(nsf.compute_neighbour_sets_parallel(6, 2).is_err());
        assert!(nsf.compute_neighbour_sets_parallel(2, 0).is_err());
        nsf.compute_neighbour_sets(4).unwrap();
        assert!(nsf.recompute_stats_for_smaller_k(5).is_err());
        assert!(NeighbourSetFinder::new(&dm, vec![0; 4]).is_err());
    } // end of test_invalid_k

    #[test]
    fn test_large_labels() {
        let dm = line_matrix();
        assert!(NeighbourSetFinder::new(&dm, vec![0, 0, 0, 4_000_000_000, 1]).is_err());
        assert!(NeighbourSetFinder::new(&dm, vec![0, 0, 0, MAX_NB_CLASSES, 1]).is_err());
        // sparse labels give the same statistics as dense ones
        let mut dense = NeighbourSetFinder::new(&dm, vec![0, 0, 0, 1, 1]).unwrap();
        dense.compute_neighbour_sets(2).unwrap();
        let big = MAX_NB_CLASSES - 1;
        let mut sparse = NeighbourSetFinder::new(&dm, vec![0, 0, 0, big, big]).unwrap();
        sparse.compute_neighbour_sets(2).unwrap();
        assert_eq!(sparse.get_nb_classes(), MAX_NB_CLASSES);
        assert_eq!(dense.get_bad_occurrences(), sparse.get_bad_occurrences());
        assert_eq!(
            dense.get_neighbour_label_entropies(),
            sparse.get_neighbour_label_entropies()
        );
        assert_eq!(
            dense.get_reverse_neighbour_label_entropies(),
            sparse.get_reverse_neighbour_label_entropies()
        );
        // reverse neighbours of 2 are 0, 1 (class 0) and 3, 4 (other class)
        assert!((sparse.get_reverse_neighbour_label_entropies()[2] - 2f64.ln()).abs() < 1.0e-10);
    } // end of test_large_labels

    #[test]
    fn test_occurrence_invariants() {
        log_init_test();
        let (dm, labels) = gen_rand_matrix(200, 20, 97531);
        let mut nsf = NeighbourSetFinder::new(&dm, labels).unwrap();
        let k = 10;
        nsf.compute_neighbour_sets(k).unwrap();
        let total: u32 = nsf.get_occurrences().iter().sum();
        assert_eq!(total as usize, 200 * k);
        for i in 0..200 {
            assert_eq!(
                nsf.get_occurrences()[i],
                nsf.get_good_occurrences()[i] + nsf.get_bad_occurrences()[i]
            );
            assert_eq!(nsf.get_reverse_neighbours_of(i).len(), nsf.get_occurrences()[i] as usize);
            assert!(nsf.get_reverse_neighbours_of(i).windows(2).all(|w| w[0] < w[1]));
            // rows sorted by distance, no self
            let dists = nsf.get_kdistances();
            for c in 1..k {
                assert!(dists[[i, c - 1]] <= dists[[i, c]]);
            }
            assert!(nsf.get_neighbours_of(i).iter().all(|n| *n != i));
        }
    } // end of test_occurrence_invariants

    #[test]
    fn test_shrink_k_equals_recompute() {
        log_init_test();
        let (dm, labels) = gen_rand_matrix(150, 10, 2468);
        let mut nsf = NeighbourSetFinder::new(&dm, labels.clone()).unwrap();
        nsf.compute_neighbour_sets(12).unwrap();
        for k_small in [1, 5, 11, 12] {
            nsf.recompute_stats_for_smaller_k(k_small).unwrap();
            let mut fresh = NeighbourSetFinder::new(&dm, labels.clone()).unwrap();
            fresh.compute_neighbour_sets(k_small).unwrap();
            assert_eq!(nsf.get_k(), k_small);
            assert_eq!(nsf.get_computed_k(), 12);
            assert_eq!(nsf.get_kneighbours(), fresh.get_kneighbours());
            assert_eq!(nsf.get_occurrences(), fresh.get_occurrences());
            assert_eq!(nsf.get_good_occurrences(), fresh.get_good_occurrences());
            assert_eq!(nsf.get_bad_occurrences(), fresh.get_bad_occurrences());
            assert_eq!(nsf.get_reverse_neighbours(), fresh.get_reverse_neighbours());
            assert_eq!(
                nsf.get_reverse_neighbour_label_entropies(),
                fresh.get_reverse_neighbour_label_entropies()
            );
            let sub = nsf.get_sub_finder(k_small).unwrap();
            assert_eq!(sub.get_computed_k(), k_small);
            assert_eq!(sub.get_occurrences(), fresh.get_occurrences());
        }
        // going back up to the computed k is allowed
        nsf.recompute_stats_for_smaller_k(12).unwrap();
        assert_eq!(nsf.get_k(), 12);
    } // end of test_shrink_k_equals_recompute

    #[test]
    fn test_parallel_equals_serial() {
        log_init_test();
        let (dm, labels) = gen_rand_matrix(123, 15, 13579);
        let mut serial = NeighbourSetFinder::new(&dm, labels.clone()).unwrap();
        serial.compute_neighbour_sets(7).unwrap();
        for nb_threads in [1, 2, 5, 16] {
            let mut parallel = NeighbourSetFinder::new(&dm, labels.clone()).unwrap();
            parallel.compute_neighbour_sets_parallel(7, nb_threads).unwrap();
            assert_eq!(serial.get_kneighbours(), parallel.get_kneighbours());
            assert_eq!(serial.get_kdistances(), parallel.get_kdistances());
            assert_eq!(serial.get_occurrences(), parallel.get_occurrences());
            assert_eq!(serial.get_reverse_neighbours(), parallel.get_reverse_neighbours());
        }
    } // end of test_parallel_equals_serial

    #[test]
    fn test_ties_lower_index_first() {
        // all points at the same distance from each other
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![1.; 6 - i - 1]).collect();
        let dm = DistanceMatrix::from_rows(rows).unwrap();
        let mut nsf = NeighbourSetFinder::new(&dm, vec![0; 6]).unwrap();
        nsf.compute_neighbour_sets(3).unwrap();
        assert_eq!(nsf.get_neighbours_of(0).to_vec(), vec![1, 2, 3]);
        assert_eq!(nsf.get_neighbours_of(4).to_vec(), vec![0, 1, 2]);
        assert_eq!(nsf.get_neighbours_of(1).to_vec(), vec![0, 2, 3]);
    }

    #[test]
    fn test_intrinsic_dim() {
        log_init_test();
        let (dm, labels) = gen_rand_matrix(300, 3, 4242);
        let mut nsf = NeighbourSetFinder::new(&dm, labels).unwrap();
        nsf.compute_neighbour_sets(25).unwrap();
        let (dim, sigma) = nsf.estimate_intrinsic_dim(100).unwrap();
        log::info!("estimated dimension {:.3e} sigma {:.3e}", dim, sigma);
        assert!(dim > 1. && dim < 6., "dim = {}", dim);
    }
} // end of mod tests
