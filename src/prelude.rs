// gathers modules to include

pub use crate::dataset::*;
pub use crate::distmatrix::DistanceMatrix;
pub use crate::hubparams::*;
pub use crate::metric::*;

pub use crate::knn::edge::{NodeIdx, OutEdge};
pub use crate::knn::*;

pub use crate::tools::io::*;
