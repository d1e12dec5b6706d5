//! dimension estimation from distances to nearest neighbours.
//!
//! Hubness grows with the intrinsic dimension of data, so an estimate of intrinsic dimension
//! is a useful companion of occurrence skewness.

use anyhow::anyhow;

use num_traits::Float;

use crate::knn::edge::OutEdge;

/// We implement the method described in :
///     Maximum likelyhood estimation of intrinsic dimension.
///     Levina E. and Bickel P.J NIPS 2004.  [Levina-Bickel](https://www.stat.berkeley.edu/~bickel/mldim.pdf)
///
/// edges must be sorted by increasing distance. At least 4 edges are necessary.
pub fn intrinsic_dimension_from_edges<F>(edges: &[OutEdge<F>]) -> anyhow::Result<f64>
where
    F: Float,
{
    let k_first: usize;
    let k_last: usize;
    if edges.len() >= 20 {
        // bickel use 10..20 as default
        k_first = 8;
        k_last = 19;
    } else if edges.len() > 3 {
        k_last = edges.len() - 1;
        k_first = 2;
    } else {
        log::error!("intrinsic_dimension_from_edges not enough edges : {}", edges.len());
        return Err(anyhow!("not enough neighbours : {}", edges.len()));
    }
    //
    let dist = |j: usize| edges[j].weight.to_f64().unwrap_or(0.);
    let d_estimate = |k: usize| -> f64 {
        let dk = dist(k);
        let mut aux = 0.;
        for j in 1..k {
            let dj = dist(j);
            if dj <= 0. || dk <= 0. {
                log::trace!("null distances {:.3e}, {:.3e}", dj, dk);
                return -1.;
            }
            aux += (dk / dj).ln();
        }
        // equal distances give 0
        if aux <= 0. {
            -1.
        } else {
            (k as f64 - 1.) / aux
        }
    };
    let mut density: f64 = 0.;
    let mut nb_pos: u32 = 0;
    for k in k_first..=k_last {
        let d = d_estimate(k);
        if d > 0. {
            density += d;
            nb_pos += 1;
        }
    }
    if nb_pos > 0 {
        Ok(density / nb_pos as f64)
    } else {
        Err(anyhow!("not positive distances"))
    }
} // end of intrinsic_dimension_from_edges

//========================================================================================

// end of mod tests
