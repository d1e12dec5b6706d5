//! Upper triangular distance matrix.
//!
//! Row i stores the distances from point i to points i+1..size, so row i has size - i - 1 entries
//! and the last row is empty. The diagonal is implicitly 0 and access through [DistanceMatrix::get]
//! is symmetric.
//!
//! The matrix can be computed from a [Dataset] and a [Metric] on one thread or with a fixed number
//! of workers, each worker computing a contiguous range of rows.

use anyhow::anyhow;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use std::ops::Range;
use std::time::SystemTime;

use cpu_time::ProcessTime;
use rayon::prelude::*;

use crate::dataset::{Dataset, Instance};
use crate::metric::Metric;

/// split 0..size in nb_parts contiguous ranges, sizes differing by at most one.
/// Ranges are in increasing order, empty ranges are dropped.
pub(crate) fn split_ranges(size: usize, nb_parts: usize) -> Vec<Range<usize>> {
    let nb_parts = nb_parts.max(1);
    let base = size / nb_parts;
    let remainder = size % nb_parts;
    let mut ranges = Vec::<Range<usize>>::with_capacity(nb_parts);
    let mut start = 0;
    for p in 0..nb_parts {
        let len = base + if p < remainder { 1 } else { 0 };
        if len > 0 {
            ranges.push(start..start + len);
        }
        start += len;
    }
    ranges
} // end of split_ranges

/// builds a dedicated pool with nb_threads workers
pub(crate) fn build_pool(nb_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    if nb_threads == 0 {
        log::error!("asked for a pool with 0 thread");
        return Err(anyhow!("number of threads must be at least 1"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nb_threads)
        .build()?;
    Ok(pool)
} // end of build_pool

//=====================================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix<F> {
    size: usize,
    /// rows\[i\] has size - i - 1 entries : distances to points i+1..size
    rows: Vec<Vec<F>>,
} // end of struct DistanceMatrix

impl<F> DistanceMatrix<F>
where
    F: Float + FromPrimitive + Send + Sync,
{
    /// builds a matrix from its upper triangular rows, checking the shape.
    pub fn from_rows(rows: Vec<Vec<F>>) -> anyhow::Result<Self> {
        let size = rows.len();
        if size == 0 {
            log::error!("DistanceMatrix::from_rows got no rows");
            return Err(anyhow!("distance matrix must have at least one row"));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size - i - 1 {
                log::error!(
                    "DistanceMatrix::from_rows row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size - i - 1
                );
                return Err(anyhow!(
                    "row {} has {} entries, expected {} for a matrix of size {}",
                    i,
                    row.len(),
                    size - i - 1,
                    size
                ));
            }
        }
        Ok(DistanceMatrix { size, rows })
    } // end of from_rows

    /// computes the matrix on the calling thread.
    /// The first error returned by metric aborts the computation.
    pub fn from_dataset(data: &Dataset<F>, metric: &dyn Metric<F>) -> anyhow::Result<Self> {
        log::debug!(
            "DistanceMatrix::from_dataset size : {}, metric : {}",
            data.size(),
            metric.get_name()
        );
        if data.is_empty() {
            log::error!("cannot compute distance matrix of an empty dataset");
            return Err(anyhow!("cannot compute distance matrix of an empty dataset"));
        }
        let instances = data.get_instances();
        let rows = (0..instances.len())
            .map(|i| compute_row(instances, i, metric))
            .collect::<anyhow::Result<Vec<Vec<F>>>>()?;
        Ok(DistanceMatrix {
            size: instances.len(),
            rows,
        })
    } // end of from_dataset

    /// computes the matrix with nb_threads workers, each one in charge of a contiguous range of rows.
    /// Workers write disjoint rows, they are concatenated in order after all workers are done.
    /// The first error returned by metric aborts the computation, no partial result is kept.
    pub fn from_dataset_parallel(
        data: &Dataset<F>,
        metric: &dyn Metric<F>,
        nb_threads: usize,
    ) -> anyhow::Result<Self> {
        log::debug!(
            "DistanceMatrix::from_dataset_parallel size : {}, metric : {}, nb_threads : {}",
            data.size(),
            metric.get_name(),
            nb_threads
        );
        if data.is_empty() {
            log::error!("cannot compute distance matrix of an empty dataset");
            return Err(anyhow!("cannot compute distance matrix of an empty dataset"));
        }
        let pool = build_pool(nb_threads)?;
        let cpu_start = ProcessTime::now();
        let sys_now = SystemTime::now();
        //
        let instances = data.get_instances();
        let ranges = split_ranges(instances.len(), nb_threads);
        let blocks: Vec<Vec<Vec<F>>> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| {
                    range
                        .map(|i| compute_row(instances, i, metric))
                        .collect::<anyhow::Result<Vec<Vec<F>>>>()
                })
                .collect::<anyhow::Result<Vec<Vec<Vec<F>>>>>()
        })?;
        let rows: Vec<Vec<F>> = blocks.into_iter().flatten().collect();
        //
        log::info!(
            "distance matrix of size {} computed, sys time(ms) {:?}, cpu time(ms) {:?}",
            rows.len(),
            sys_now.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        Ok(DistanceMatrix {
            size: instances.len(),
            rows,
        })
    } // end of from_dataset_parallel

    /// number of points
    pub fn get_size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// distance between i and j, symmetric, 0 on diagonal
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> F {
        if i == j {
            F::zero()
        } else if i < j {
            self.rows[i][j - i - 1]
        } else {
            self.rows[j][i - j - 1]
        }
    } // end of get

    /// distances from i to points i+1..size
    pub fn get_row(&self, i: usize) -> &[F] {
        &self.rows[i]
    }

    pub fn get_rows(&self) -> &[Vec<F>] {
        &self.rows
    }

    /// largest stored distance, 0 for a matrix of one point
    pub fn get_max_distance(&self) -> F {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .fold(F::zero(), |acc, d| acc.max(*d))
    }
} // end of impl DistanceMatrix

// distances from instance i to instances i+1..
fn compute_row<F>(instances: &[Instance<F>], i: usize, metric: &dyn Metric<F>) -> anyhow::Result<Vec<F>>
where
    F: Float,
{
    let mut row = Vec::<F>::with_capacity(instances.len() - i - 1);
    for j in i + 1..instances.len() {
        row.push(metric.dist(&instances[i], &instances[j])?);
    }
    Ok(row)
} // end of compute_row

//========================================================================================

// end of mod tests
