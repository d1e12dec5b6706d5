//! This module defines parameters driving hubness analysis.
//!
//! - k : the number of neighbours of kNN sets. Default 10.
//!
//! - nb_threads : number of workers for distance matrix, kNN sets and shared neighbour computations.
//!   Default is the number of cpus seen by rayon.
//!
//! - k_shared : size of neighbourhoods compared by shared neighbour similarity. Default 50 as
//!   shared neighbour distances need rather large neighbourhoods. 0 disables the secondary distance.
//!
//! - weighting : see [SharedWeighting]. Default is simhub.
//!
//! - theta : offset in informativeness of a neighbour, must be > 0. Default 1.

use crate::knn::snf::SharedWeighting;

/// main parameters driving hubness analysis
#[derive(Clone, Copy, Debug)]
pub struct HubnessParams {
    /// number of neighbours
    pub k: usize,
    /// number of workers
    pub nb_threads: usize,
    /// neighbourhood size for shared neighbour similarity, 0 means no secondary distance
    pub k_shared: usize,
    /// weighting of shared neighbours
    pub weighting: SharedWeighting,
    /// informativeness offset
    pub theta: f64,
} // end of HubnessParams

impl Default for HubnessParams {
    fn default() -> Self {
        HubnessParams {
            k: 10,
            nb_threads: rayon::current_num_threads(),
            k_shared: 50,
            weighting: SharedWeighting::Hub,
            theta: 1.,
        }
    }
}

impl HubnessParams {
    pub fn new(k: usize, nb_threads: usize, k_shared: usize, weighting: SharedWeighting, theta: f64) -> Self {
        HubnessParams {
            k,
            nb_threads,
            k_shared,
            weighting,
            theta,
        }
    }

    pub fn log(&self) {
        log::info!("HubnessParams");
        log::info!("\t k : {}", self.k);
        log::info!("\t nb threads : {}", self.nb_threads);
        log::info!("\t shared neighbourhood size : {}", self.k_shared);
        log::info!("\t shared neighbour weighting : {:?}", self.weighting);
        log::info!("\t theta : {}", self.theta);
    }

    pub fn get_k(&self) -> usize {
        self.k
    }

    pub fn set_k(&mut self, k: usize) {
        self.k = k;
    }

    pub fn get_nb_threads(&self) -> usize {
        self.nb_threads
    }

    pub fn set_nb_threads(&mut self, nb_threads: usize) {
        self.nb_threads = nb_threads;
    }

    pub fn get_k_shared(&self) -> usize {
        self.k_shared
    }

    /// 0 disables secondary distance computation
    pub fn set_k_shared(&mut self, k_shared: usize) {
        self.k_shared = k_shared;
    }

    pub fn get_weighting(&self) -> SharedWeighting {
        self.weighting
    }

    pub fn set_weighting(&mut self, weighting: SharedWeighting) {
        self.weighting = weighting;
    }

    pub fn get_theta(&self) -> f64 {
        self.theta
    }

    pub fn set_theta(&mut self, theta: f64) {
        self.theta = theta;
    }
} // end of impl HubnessParams
