//! Some tools for statistics, intrinsic dimension and io.

pub mod dimension;
pub mod io;
pub mod stats;
