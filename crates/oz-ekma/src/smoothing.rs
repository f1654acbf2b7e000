//! Gaussian smoothing that respects undefined cells.

use crate::error::{EkmaError, EkmaResult, Stage};
use crate::grid::Grid;
use nalgebra::DMatrix;
use oz_core::Real;

/// Kernel radius in multiples of sigma.
const TRUNCATE: Real = 4.0;

/// Normalized Gaussian convolution over defined cells.
///
/// `sigma` is measured in grid cells. Undefined neighbours contribute no
/// weight and undefined cells stay undefined. `sigma == 0` returns the input
/// unchanged.
pub fn gaussian_smooth(grid: &Grid, sigma: Real) -> EkmaResult<Grid> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(EkmaError::invalid(
            Stage::Smooth,
            format!("smoothing sigma must be >= 0 (got {sigma})"),
        ));
    }
    if sigma == 0.0 {
        return Ok(grid.clone());
    }

    let radius = (TRUNCATE * sigma).ceil() as isize;
    let kernel: Vec<Real> = (-radius..=radius)
        .map(|d| (-(d * d) as Real / (2.0 * sigma * sigma)).exp())
        .collect();

    let src = grid.values();
    let (rows, cols) = src.shape();
    let mut out = DMatrix::from_element(rows, cols, None);

    for r in 0..rows {
        for c in 0..cols {
            if src[(r, c)].is_none() {
                continue;
            }
            let mut acc = 0.0;
            let mut wsum = 0.0;
            for dr in -radius..=radius {
                let rr = r as isize + dr;
                if rr < 0 || rr >= rows as isize {
                    continue;
                }
                let wr = kernel[(dr + radius) as usize];
                for dc in -radius..=radius {
                    let cc = c as isize + dc;
                    if cc < 0 || cc >= cols as isize {
                        continue;
                    }
                    if let Some(v) = src[(rr as usize, cc as usize)] {
                        let w = wr * kernel[(dc + radius) as usize];
                        acc += w * v;
                        wsum += w;
                    }
                }
            }
            // The centre cell is defined, so wsum > 0.
            out[(r, c)] = Some(acc / wsum);
        }
    }

    Ok(grid.with_values(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike_grid() -> Grid {
        let mut o3 = DMatrix::from_element(7, 7, Some(0.0));
        o3[(3, 3)] = Some(49.0);
        o3[(0, 0)] = None;
        Grid::new(
            (0..7).map(|i| i as Real).collect(),
            (0..7).map(|i| i as Real).collect(),
            o3,
        )
        .unwrap()
    }

    #[test]
    fn zero_sigma_is_identity() {
        let grid = spike_grid();
        let once = gaussian_smooth(&grid, 0.0).unwrap();
        let twice = gaussian_smooth(&once, 0.0).unwrap();
        assert_eq!(grid, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn smoothing_spreads_spike_and_keeps_holes() {
        let smoothed = gaussian_smooth(&spike_grid(), 1.0).unwrap();
        assert!(smoothed.get(0, 0).is_none());
        let centre = smoothed.get(3, 3).unwrap();
        let neighbour = smoothed.get(3, 4).unwrap();
        assert!(centre < 49.0);
        assert!(neighbour > 0.0);
        assert!(centre > neighbour);
    }

    #[test]
    fn constant_surface_is_fixed_point() {
        let o3 = DMatrix::from_element(5, 4, Some(12.5));
        let grid = Grid::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 2.0, 3.0, 4.0], o3).unwrap();
        let smoothed = gaussian_smooth(&grid, 2.0).unwrap();
        assert!(smoothed.values().iter().all(|v| (v.unwrap() - 12.5).abs() < 1e-12));
    }

    #[test]
    fn negative_sigma_rejected() {
        let err = gaussian_smooth(&spike_grid(), -1.0).unwrap_err();
        assert_eq!(err.stage(), Stage::Smooth);
    }
}
