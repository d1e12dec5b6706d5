//! kNN sets computed from a distance matrix, hubness statistics and shared neighbour secondary distances.
//!
//! - [NeighbourSetFinder](nsf::NeighbourSetFinder) computes kNN sets, occurrences and reverse neighbours.
//! - [Hubness](hubness::Hubness) gives statistics on occurrences.
//! - [SharedNeighbourFinder](snf::SharedNeighbourFinder) derives a secondary distance from shared neighbours.

pub mod edge;

pub mod nsf;
pub use nsf::NeighbourSetFinder;

pub mod hubness;
pub use hubness::{Hubness, HubnessSummary};

pub mod snf;
pub use snf::{SharedNeighbourFinder, SharedWeighting};
