//! Ridge line: the NOx level maximizing O3 for each VOC column.

use crate::grid::Grid;
use oz_core::Real;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgePoint {
    pub voc: Real,
    pub nox: Real,
    pub o3: Real,
}

/// Ridge points ordered by increasing VOC.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RidgeCurve {
    points: Vec<RidgePoint>,
}

impl RidgeCurve {
    pub fn new(points: Vec<RidgePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[RidgePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RidgePoint> {
        self.points.iter()
    }

    /// Slopes `dNOx/dVOC` between neighbours; pairs with equal VOC are skipped.
    pub fn slopes(&self) -> Vec<Real> {
        self.points
            .windows(2)
            .filter_map(|w| {
                let dv = w[1].voc - w[0].voc;
                if dv == 0.0 {
                    return None;
                }
                let s = (w[1].nox - w[0].nox) / dv;
                s.is_finite().then_some(s)
            })
            .collect()
    }
}

/// Extract the ridge from a gridded surface.
///
/// Fully undefined columns contribute nothing. Exact ties go to the smallest
/// NOx, i.e. the first row reaching the maximum.
pub fn extract_ridge(grid: &Grid) -> RidgeCurve {
    let nox_axis = grid.nox_axis();
    let points = grid
        .voc_axis()
        .iter()
        .enumerate()
        .filter_map(|(c, &voc)| {
            let mut best: Option<(usize, Real)> = None;
            for (r, cell) in grid.column(c).enumerate() {
                let Some(v) = cell else { continue };
                match best {
                    Some((_, b)) if v <= b => {}
                    _ => best = Some((r, v)),
                }
            }
            best.map(|(r, o3)| RidgePoint {
                voc,
                nox: nox_axis[r],
                o3,
            })
        })
        .collect();
    RidgeCurve::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn grid(rows: &[&[Option<Real>]]) -> Grid {
        let nrows = rows.len();
        let ncols = rows[0].len();
        let flat: Vec<Option<Real>> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Grid::new(
            (0..ncols).map(|i| 10.0 * (i + 1) as Real).collect(),
            (0..nrows).map(|i| i as Real + 1.0).collect(),
            DMatrix::from_row_slice(nrows, ncols, &flat),
        )
        .unwrap()
    }

    #[test]
    fn undefined_column_is_skipped() {
        let g = grid(&[
            &[Some(1.0), None, Some(5.0)],
            &[Some(3.0), None, Some(2.0)],
        ]);
        let ridge = extract_ridge(&g);
        assert_eq!(ridge.len(), 2);
        assert_eq!(ridge.points()[0], RidgePoint { voc: 10.0, nox: 2.0, o3: 3.0 });
        assert_eq!(ridge.points()[1], RidgePoint { voc: 30.0, nox: 1.0, o3: 5.0 });
    }

    #[test]
    fn single_defined_cell_is_the_ridge_point() {
        let g = grid(&[&[None, Some(1.0)], &[Some(7.0), Some(1.0)], &[None, Some(0.5)]]);
        let ridge = extract_ridge(&g);
        assert_eq!(ridge.points()[0], RidgePoint { voc: 10.0, nox: 2.0, o3: 7.0 });
    }

    #[test]
    fn ties_pick_smallest_nox() {
        let g = grid(&[&[Some(2.0)], &[Some(9.0)], &[Some(9.0)], &[Some(1.0)]]);
        for _ in 0..3 {
            let ridge = extract_ridge(&g);
            assert_eq!(ridge.points()[0].nox, 2.0);
        }
    }

    #[test]
    fn all_undefined_gives_empty_curve() {
        let g = grid(&[&[None, None], &[None, None]]);
        assert!(extract_ridge(&g).is_empty());
    }

    #[test]
    fn slopes_skip_vertical_pairs() {
        let ridge = RidgeCurve::new(vec![
            RidgePoint { voc: 1.0, nox: 1.0, o3: 0.0 },
            RidgePoint { voc: 1.0, nox: 5.0, o3: 0.0 },
            RidgePoint { voc: 3.0, nox: 9.0, o3: 0.0 },
        ]);
        assert_eq!(ridge.slopes(), vec![2.0]);
    }
}
