//! Distances between instances of a [Dataset](crate::dataset::Dataset).
//!
//! All metrics aggregate in a tolerant way: a pair of components contributes only if both values
//! are present (finite float, `Some` integer or nominal). Missing components are skipped, they do not
//! abort the comparison. Two instances with no comparable component are at distance 0.
//!
//! Metrics are also reachable by name through a registry, see [metric_from_name].
//! Names follow the convention of hnsw_rs : "DistL1", "DistL2", "DistLp", "DistCosine", "DistCombined".

use anyhow::anyhow;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use crate::dataset::Instance;

/// A distance between two instances.
pub trait Metric<F>: Send + Sync {
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F>;
    fn get_name(&self) -> &str;
}

// instances compared must have the same number of attributes of each kind
fn check_dims<F>(a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<()> {
    if a.floats.len() != b.floats.len()
        || a.ints.len() != b.ints.len()
        || a.nominals.len() != b.nominals.len()
    {
        log::error!("metric got instances with different numbers of attributes");
        return Err(anyhow!(
            "cannot compare instances with ({}, {}, {}) and ({}, {}, {}) attributes",
            a.floats.len(),
            a.ints.len(),
            a.nominals.len(),
            b.floats.len(),
            b.ints.len(),
            b.nominals.len()
        ));
    }
    Ok(())
} // end of check_dims

fn to_f<F: FromPrimitive>(x: f64) -> anyhow::Result<F> {
    F::from_f64(x).ok_or_else(|| anyhow!("cannot convert distance {:.3e}", x))
}

// sum of |x-y|^p over accepted float and integer pairs
fn sum_abs_pow<F: Float>(a: &Instance<F>, b: &Instance<F>, p: f64) -> f64 {
    let mut sum = 0f64;
    for (x, y) in a.floats.iter().zip(b.floats.iter()) {
        if x.is_finite() && y.is_finite() {
            let delta = (*x - *y).abs().to_f64().unwrap_or(0.);
            sum += if p == 1. { delta } else if p == 2. { delta * delta } else { delta.powf(p) };
        }
    }
    for (x, y) in a.ints.iter().zip(b.ints.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            let delta = (*x as f64 - *y as f64).abs();
            sum += if p == 1. { delta } else if p == 2. { delta * delta } else { delta.powf(p) };
        }
    }
    sum
} // end of sum_abs_pow

//==================================================================================

/// Minkowski distance of order p >= 1 over float and integer attributes.
#[derive(Clone, Copy, Debug)]
pub struct DistMinkowski {
    p: f64,
}

impl DistMinkowski {
    pub fn new(p: f64) -> anyhow::Result<Self> {
        if !p.is_finite() || p < 1. {
            log::error!("DistMinkowski::new invalid order {}", p);
            return Err(anyhow!("Minkowski order must be finite and >= 1, got {}", p));
        }
        Ok(DistMinkowski { p })
    }

    pub fn get_order(&self) -> f64 {
        self.p
    }
} // end of impl DistMinkowski

impl<F> Metric<F> for DistMinkowski
where
    F: Float + FromPrimitive + Send + Sync,
{
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F> {
        check_dims(a, b)?;
        let sum = sum_abs_pow(a, b, self.p);
        to_f(sum.powf(1. / self.p))
    }

    fn get_name(&self) -> &str {
        "DistLp"
    }
} // end of impl Metric for DistMinkowski

/// Manhattan distance
#[derive(Clone, Copy, Debug, Default)]
pub struct DistL1;

impl<F> Metric<F> for DistL1
where
    F: Float + FromPrimitive + Send + Sync,
{
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F> {
        check_dims(a, b)?;
        to_f(sum_abs_pow(a, b, 1.))
    }

    fn get_name(&self) -> &str {
        "DistL1"
    }
}

/// Euclidean distance
#[derive(Clone, Copy, Debug, Default)]
pub struct DistL2;

impl<F> Metric<F> for DistL2
where
    F: Float + FromPrimitive + Send + Sync,
{
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F> {
        check_dims(a, b)?;
        to_f(sum_abs_pow(a, b, 2.).sqrt())
    }

    fn get_name(&self) -> &str {
        "DistL2"
    }
}

/// 1 - cosine between float parts of instances.
/// The norms are computed on accepted components only, a null norm gives distance 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistCosine;

impl<F> Metric<F> for DistCosine
where
    F: Float + FromPrimitive + Send + Sync,
{
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F> {
        check_dims(a, b)?;
        let mut dot = 0f64;
        let mut norm_a = 0f64;
        let mut norm_b = 0f64;
        for (x, y) in a.floats.iter().zip(b.floats.iter()) {
            if x.is_finite() && y.is_finite() {
                let x = x.to_f64().unwrap_or(0.);
                let y = y.to_f64().unwrap_or(0.);
                dot += x * y;
                norm_a += x * x;
                norm_b += y * y;
            }
        }
        if norm_a <= 0. || norm_b <= 0. {
            return Ok(F::one());
        }
        let dist = 1. - dot / (norm_a * norm_b).sqrt();
        to_f(dist.max(0.))
    }

    fn get_name(&self) -> &str {
        "DistCosine"
    }
} // end of impl Metric for DistCosine

/// Euclidean on float and integer attributes, each nominal mismatch adds 1 to the squared sum.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistCombined;

impl<F> Metric<F> for DistCombined
where
    F: Float + FromPrimitive + Send + Sync,
{
    fn dist(&self, a: &Instance<F>, b: &Instance<F>) -> anyhow::Result<F> {
        check_dims(a, b)?;
        let mut sum = sum_abs_pow(a, b, 2.);
        for (x, y) in a.nominals.iter().zip(b.nominals.iter()) {
            if let (Some(x), Some(y)) = (x, y) {
                if x != y {
                    sum += 1.;
                }
            }
        }
        to_f(sum.sqrt())
    }

    fn get_name(&self) -> &str {
        "DistCombined"
    }
} // end of impl Metric for DistCombined

//==================================================================================

/// Kinds of metric the registry can build
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    L1,
    L2,
    /// Minkowski with order 3
    Lp,
    Cosine,
    Combined,
}

/// default order of "DistLp" when built by name
pub const DEFAULT_MINKOWSKI_ORDER: f64 = 3.;

impl MetricKind {
    pub fn build<F>(&self) -> Box<dyn Metric<F>>
    where
        F: Float + FromPrimitive + Send + Sync + 'static,
    {
        match self {
            MetricKind::L1 => Box::new(DistL1),
            MetricKind::L2 => Box::new(DistL2),
            MetricKind::Lp => Box::new(DistMinkowski {
                p: DEFAULT_MINKOWSKI_ORDER,
            }),
            MetricKind::Cosine => Box::new(DistCosine),
            MetricKind::Combined => Box::new(DistCombined),
        }
    }
} // end of impl MetricKind

lazy_static! {
    static ref METRIC_REGISTRY: IndexMap<&'static str, MetricKind> = {
        let mut registry = IndexMap::new();
        registry.insert("DistL1", MetricKind::L1);
        registry.insert("DistL2", MetricKind::L2);
        registry.insert("DistLp", MetricKind::Lp);
        registry.insert("DistCosine", MetricKind::Cosine);
        registry.insert("DistCombined", MetricKind::Combined);
        registry
    };
}

/// returns names of registered metrics, in registration order
pub fn get_metric_names() -> Vec<&'static str> {
    METRIC_REGISTRY.keys().copied().collect()
}

/// get the kind of a registered metric by name
pub fn metric_kind_from_name(name: &str) -> anyhow::Result<MetricKind> {
    match METRIC_REGISTRY.get(name) {
        Some(kind) => Ok(*kind),
        None => {
            log::error!("unknown distance : {}", name);
            Err(anyhow!(
                "unknown distance {}, known distances : {:?}",
                name,
                get_metric_names()
            ))
        }
    }
} // end of metric_kind_from_name

/// builds a metric from its registered name
pub fn metric_from_name<F>(name: &str) -> anyhow::Result<Box<dyn Metric<F>>>
where
    F: Float + FromPrimitive + Send + Sync + 'static,
{
    Ok(metric_kind_from_name(name)?.build::<F>())
}

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test metric  -- --nocapture

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0e-10
    }

    #[test]
    fn test_lp_distances() {
        let a = Instance::<f64>::from_floats(vec![0., 0.], 0);
        let b = Instance::<f64>::from_floats(vec![3., 4.], 0);
        assert!(close(DistL2.dist(&a, &b).unwrap(), 5.));
        assert!(close(DistL1.dist(&a, &b).unwrap(), 7.));
        let d3 = DistMinkowski::new(3.).unwrap().dist(&a, &b).unwrap();
        assert!(close(d3, (27f64 + 64.).powf(1. / 3.)));
        assert!(DistMinkowski::new(0.5).is_err());
    } // end of test_lp_distances

    #[test]
    fn test_tolerant_aggregation() {
        // second component missing in a, third in b : only first component counts
        let a = Instance::<f32>::from_floats(vec![1., f32::NAN, 2.], 0);
        let b = Instance::<f32>::from_floats(vec![4., 7., f32::INFINITY], 0);
        let d: f32 = DistL2.dist(&a, &b).unwrap();
        assert!((d - 3.).abs() < 1.0e-6);
        // no comparable component at all
        let c = Instance::<f32>::from_floats(vec![f32::NAN, 1., 1.], 0);
        let e = Instance::<f32>::from_floats(vec![1., f32::NAN, f32::NAN], 0);
        let d: f32 = DistL1.dist(&c, &e).unwrap();
        assert_eq!(d, 0.);
    } // end of test_tolerant_aggregation

    #[test]
    fn test_dimension_mismatch() {
        let a = Instance::<f32>::from_floats(vec![1., 2.], 0);
        let b = Instance::<f32>::from_floats(vec![1.], 0);
        assert!(DistL2.dist(&a, &b).is_err());
    }

    #[test]
    fn test_cosine() {
        let a = Instance::<f64>::from_floats(vec![1., 0.], 0);
        let b = Instance::<f64>::from_floats(vec![0., 2.], 0);
        let c = Instance::<f64>::from_floats(vec![3., 0.], 0);
        let z = Instance::<f64>::from_floats(vec![0., 0.], 0);
        assert!(close(DistCosine.dist(&a, &b).unwrap(), 1.));
        assert!(close(DistCosine.dist(&a, &c).unwrap(), 0.));
        assert!(close(DistCosine.dist(&a, &z).unwrap(), 1.));
    }

    #[test]
    fn test_combined() {
        let a = Instance::<f64>::new(vec![0.], vec![Some(1), None], vec![Some(0), Some(1)], 0);
        let b = Instance::<f64>::new(vec![1.], vec![Some(2), Some(5)], vec![Some(1), None], 0);
        // 1 (float) + 1 (first int) + 1 (first nominal mismatch)
        assert!(close(DistCombined.dist(&a, &b).unwrap(), 3f64.sqrt()));
    }

    #[test]
    fn test_registry() {
        assert_eq!(get_metric_names()[0], "DistL1");
        let metric = metric_from_name::<f32>("DistL2").unwrap();
        assert_eq!(metric.get_name(), "DistL2");
        let lp = metric_from_name::<f32>("DistLp").unwrap();
        assert_eq!(lp.get_name(), "DistLp");
        assert!(metric_from_name::<f32>("DistHamming").is_err());
        assert_eq!(metric_kind_from_name("DistCosine").unwrap(), MetricKind::Cosine);
    } // end of test_registry
} // end of mod tests
