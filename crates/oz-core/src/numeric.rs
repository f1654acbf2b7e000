//! Scalar type and small float helpers shared by the analysis crates.

pub type Real = f64;

/// Absolute and relative tolerance for comparing computed values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerance {
    pub const TIGHT: Self = Self {
        abs: 1e-12,
        rel: 1e-9,
    };

    /// `a` and `b` agree within `abs`, or within `rel` of the larger magnitude.
    pub fn approx_eq(&self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }
}

/// `n` evenly spaced points from `start` to `end`, endpoint exact.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            let mut points: Vec<Real> = (0..n).map(|i| start + i as Real * step).collect();
            points[n - 1] = end;
            points
        }
    }
}

/// True when every element is strictly greater than its predecessor.
pub fn is_strictly_increasing(values: &[Real]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_tolerance() {
        let tol = Tolerance::TIGHT;
        assert!(tol.approx_eq(1.0, 1.0 + 1e-12));
        assert!(tol.approx_eq(0.0, 1e-13));
        assert!(tol.approx_eq(1e6, 1e6 + 1e-4));
        assert!(!tol.approx_eq(1.0, 1.0 + 1e-6));
    }

    #[test]
    fn linspace_hits_endpoints() {
        let pts = linspace(2.0, 4.0, 5);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], 2.0);
        assert!((pts[2] - 3.0).abs() < 1e-12);
        assert_eq!(pts[4], 4.0);
        assert!(is_strictly_increasing(&pts));
    }

    #[test]
    fn strictly_increasing_rejects_plateau() {
        assert!(!is_strictly_increasing(&[1.0, 2.0, 2.0]));
        assert!(is_strictly_increasing(&[1.0]));
    }
}
