//! Moments, correlation and entropy of occurrence frequencies.
//!
//! Moments are population moments (division by n).
//! Degenerate inputs do not fail: a constant array has skewness, kurtosis and correlation 0.

use anyhow::anyhow;

/// variance below this threshold is considered null
const VAR_EPSILON: f64 = 1.0e-12;

/// converts counts to f64 for statistics
pub fn to_f64_vec<T>(values: &[T]) -> Vec<f64>
where
    T: Into<f64> + Copy,
{
    values.iter().map(|v| (*v).into()).collect()
}

/// mean, 0. on empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// central moment of order `order`
fn central_moment(values: &[f64], mu: f64, order: i32) -> f64 {
    if values.is_empty() {
        return 0.;
    }
    values.iter().map(|x| (x - mu).powi(order)).sum::<f64>() / values.len() as f64
}

/// standard deviation (population), 0. on empty input
pub fn stdev(values: &[f64]) -> f64 {
    let mu = mean(values);
    central_moment(values, mu, 2).sqrt()
}

/// standardized third moment
pub fn skewness(values: &[f64]) -> f64 {
    let mu = mean(values);
    let m2 = central_moment(values, mu, 2);
    if m2 <= VAR_EPSILON {
        return 0.;
    }
    central_moment(values, mu, 3) / m2.powf(1.5)
} // end of skewness

/// excess kurtosis : standardized fourth moment minus 3
pub fn kurtosis(values: &[f64]) -> f64 {
    let mu = mean(values);
    let m2 = central_moment(values, mu, 2);
    if m2 <= VAR_EPSILON {
        return 0.;
    }
    central_moment(values, mu, 4) / (m2 * m2) - 3.
} // end of kurtosis

/// Pearson correlation between x and y. Returns 0. if one of them is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> anyhow::Result<f64> {
    if x.len() != y.len() {
        return Err(anyhow!(
            "cannot correlate arrays of length {} and {}",
            x.len(),
            y.len()
        ));
    }
    if x.is_empty() {
        return Err(anyhow!("cannot correlate empty arrays"));
    }
    let mu_x = mean(x);
    let mu_y = mean(y);
    let mut cov = 0.;
    let mut var_x = 0.;
    let mut var_y = 0.;
    for (a, b) in x.iter().zip(y.iter()) {
        cov += (a - mu_x) * (b - mu_y);
        var_x += (a - mu_x) * (a - mu_x);
        var_y += (b - mu_y) * (b - mu_y);
    }
    let n = x.len() as f64;
    if var_x / n <= VAR_EPSILON || var_y / n <= VAR_EPSILON {
        return Ok(0.);
    }
    Ok(cov / (var_x * var_y).sqrt())
} // end of pearson_correlation

/// Shannon entropy (natural log) of the distribution given by counts. 0. if all counts are null.
pub fn entropy(counts: &[u32]) -> f64 {
    let total: u64 = counts.iter().map(|c| *c as u64).sum();
    if total == 0 {
        return 0.;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.ln()
        })
        .sum()
} // end of entropy

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test stats  -- --nocapture

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0e-9
    }

    #[test]
    fn test_constant_array() {
        let values = vec![5.; 12];
        assert!(close(mean(&values), 5.));
        assert_eq!(stdev(&values), 0.);
        assert_eq!(skewness(&values), 0.);
        assert_eq!(kurtosis(&values), 0.);
        let other: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert_eq!(pearson_correlation(&values, &other).unwrap(), 0.);
        // empty input
        assert_eq!(mean(&[]), 0.);
        assert_eq!(skewness(&[]), 0.);
    } // end of test_constant_array

    #[test]
    fn test_moments() {
        // symmetric
        let values = vec![1., 2., 3., 4., 5.];
        assert!(close(skewness(&values), 0.));
        assert!(close(stdev(&values), 2f64.sqrt()));
        // m2 = 2, m4 = (16+1+0+1+16)/5 = 6.8
        assert!(close(kurtosis(&values), 6.8 / 4. - 3.));
        // right tail gives positive skewness
        let skewed = vec![0., 0., 0., 0., 10.];
        assert!(skewness(&skewed) > 1.);
        let counts: Vec<u32> = vec![1, 1, 1, 7];
        assert!(skewness(&to_f64_vec(&counts)) > 0.);
    } // end of test_moments

    #[test]
    fn test_pearson() {
        let x = vec![1., 2., 3., 4.];
        let y = vec![2., 4., 6., 8.];
        let z = vec![8., 6., 4., 2.];
        assert!(close(pearson_correlation(&x, &y).unwrap(), 1.));
        assert!(close(pearson_correlation(&x, &z).unwrap(), -1.));
        assert!(pearson_correlation(&x, &[1., 2.]).is_err());
        assert!(pearson_correlation(&[], &[]).is_err());
    } // end of test_pearson

    #[test]
    fn test_entropy() {
        assert_eq!(entropy(&[0, 0]), 0.);
        assert_eq!(entropy(&[4, 0, 0]), 0.);
        assert!(close(entropy(&[3, 3]), 2f64.ln()));
        assert!(close(entropy(&[1, 1, 1, 1]), 4f64.ln()));
    }
} // end of mod tests
