//! Robust descriptive statistics used by the sensitivity and EKMA paths.
//!
//! All functions ignore nothing silently: callers are expected to pass finite
//! values, and functions return `None` when the statistic is undefined
//! (empty input, zero variance).

use crate::Real;

fn sorted(values: &[Real]) -> Vec<Real> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Percentile `q` in `[0, 100]` with linear interpolation between order statistics.
pub fn percentile(values: &[Real], q: Real) -> Option<Real> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let v = sorted(values);
    let pos = q / 100.0 * (v.len() - 1) as Real;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as Real;
    Some(v[lo] + (v[hi] - v[lo]) * frac)
}

pub fn median(values: &[Real]) -> Option<Real> {
    percentile(values, 50.0)
}

/// First and third quartiles.
pub fn quartiles(values: &[Real]) -> Option<(Real, Real)> {
    Some((percentile(values, 25.0)?, percentile(values, 75.0)?))
}

/// Inclusive acceptance band `[q1 - k*iqr, q3 + k*iqr]`.
pub fn iqr_bounds(values: &[Real], multiplier: Real) -> Option<(Real, Real)> {
    let (q1, q3) = quartiles(values)?;
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

pub fn mean(values: &[Real]) -> Option<Real> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Real>() / values.len() as Real)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[Real]) -> Option<Real> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: Real = values.iter().map(|x| (x - m) * (x - m)).sum();
    Some((ss / (values.len() - 1) as Real).sqrt())
}

/// 1-based ranks; tied values share the average of their positions.
pub fn ranks(values: &[Real]) -> Vec<Real> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j are tied
        let avg = (i + j) as Real / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            out[idx] = avg;
        }
        i = j + 1;
    }
    out
}

pub fn pearson(x: &[Real], y: &[Real]) -> Option<Real> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Spearman rank correlation: Pearson correlation of the tie-averaged ranks.
pub fn spearman(x: &[Real], y: &[Real]) -> Option<Real> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percentile_is_monotone_in_q(
            values in prop::collection::vec(-1.0e3_f64..1.0e3_f64, 1..40),
            a in 0.0_f64..100.0,
            b in 0.0_f64..100.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = percentile(&values, lo).unwrap();
            let p_hi = percentile(&values, hi).unwrap();
            prop_assert!(p_lo <= p_hi + 1e-9);
        }

        #[test]
        fn spearman_is_bounded(
            pairs in prop::collection::vec((0.0_f64..100.0, 0.0_f64..100.0), 3..30),
        ) {
            let x: Vec<Real> = pairs.iter().map(|p| p.0).collect();
            let y: Vec<Real> = pairs.iter().map(|p| p.1).collect();
            if let Some(rho) = spearman(&x, &y) {
                prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&rho));
            }
        }
    }
}
