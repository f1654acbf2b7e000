//! Scattered (VOC, NOx, O3) observations onto a regular grid.
//!
//! Interpolation happens over a Delaunay triangulation of the observations:
//!
//! - `Linear`: barycentric weights inside each triangle
//! - `Cubic`: cubic Bezier patch per triangle, with edge control points taken
//!   from least-squares vertex gradients (exact on planes)
//!
//! Grid cells outside the convex hull of the observations stay undefined.

use crate::error::{EkmaError, EkmaResult, Stage};
use crate::grid::Grid;
use crate::smoothing::gaussian_smooth;
use crate::triangulation::Triangulation;
use nalgebra::{DMatrix, Matrix2, Vector2};
use oz_core::{ObservationSet, Real, linspace, stats};
use std::collections::BTreeMap;
use std::fmt;

/// Surface interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    Linear,
    #[default]
    Cubic,
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// Number of grid points along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub voc_points: usize,
    pub nox_points: usize,
}

impl Resolution {
    pub fn square(points: usize) -> Self {
        Self {
            voc_points: points,
            nox_points: points,
        }
    }
}

/// Percentile bounds used to clip the grid axes, e.g. `2..98`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileWindow {
    pub lower: Real,
    pub upper: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationOptions {
    pub resolution: Resolution,
    pub method: InterpolationMethod,
    /// Gaussian sigma in grid cells; 0 disables smoothing.
    pub smoothing_sigma: Real,
    /// Restrict axes to a percentile window instead of the full min-max span.
    pub percentile_window: Option<PercentileWindow>,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::square(100),
            method: InterpolationMethod::Cubic,
            smoothing_sigma: 0.0,
            percentile_window: None,
        }
    }
}

impl InterpolationOptions {
    pub fn validate(&self) -> EkmaResult<()> {
        let r = self.resolution;
        if r.voc_points < 2 || r.nox_points < 2 {
            return Err(EkmaError::invalid(
                Stage::Interpolate,
                format!(
                    "resolution must be at least 2 per axis (got {}x{})",
                    r.voc_points, r.nox_points
                ),
            ));
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return Err(EkmaError::invalid(
                Stage::Smooth,
                format!("smoothing sigma must be >= 0 (got {})", self.smoothing_sigma),
            ));
        }
        if let Some(w) = self.percentile_window {
            let in_range = (0.0..=100.0).contains(&w.lower) && (0.0..=100.0).contains(&w.upper);
            if !in_range || w.lower >= w.upper {
                return Err(EkmaError::invalid(
                    Stage::Interpolate,
                    format!(
                        "percentile window must satisfy 0 <= lower < upper <= 100 (got {}..{})",
                        w.lower, w.upper
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Interpolate observations onto a regular grid.
pub fn interpolate(
    observations: &ObservationSet,
    options: &InterpolationOptions,
) -> EkmaResult<Grid> {
    options.validate()?;

    let cleaned = observations.cleaned();
    if cleaned.len() < 3 {
        return Err(EkmaError::insufficient(
            Stage::Interpolate,
            format!(
                "fewer than 3 valid observations ({} of {} usable)",
                cleaned.len(),
                observations.len()
            ),
        ));
    }

    let (xs, ys, zs) = merge_duplicates(&cleaned);
    let points: Vec<[Real; 2]> = xs.iter().zip(&ys).map(|(&x, &y)| [x, y]).collect();
    let tri = Triangulation::new(&points)?;

    let voc_axis = axis(&xs, options.resolution.voc_points, options.percentile_window, "VOC")?;
    let nox_axis = axis(&ys, options.resolution.nox_points, options.percentile_window, "NOx")?;

    let gradients = match options.method {
        InterpolationMethod::Linear => Vec::new(),
        InterpolationMethod::Cubic => vertex_gradients(&tri, &zs),
    };

    let mut o3 = DMatrix::from_element(nox_axis.len(), voc_axis.len(), None);
    for (row, &nox) in nox_axis.iter().enumerate() {
        for (col, &voc) in voc_axis.iter().enumerate() {
            let p = tri.to_unit(voc, nox);
            o3[(row, col)] = tri.locate(p).map(|(t, w)| match options.method {
                InterpolationMethod::Linear => linear_value(&tri, t, w, &zs),
                InterpolationMethod::Cubic => cubic_value(&tri, t, w, &zs, &gradients),
            });
        }
    }

    let grid = Grid::new(voc_axis, nox_axis, o3)?;
    tracing::debug!(
        method = %options.method,
        observations = cleaned.len(),
        defined = grid.defined_count(),
        "interpolated isopleth surface"
    );

    gaussian_smooth(&grid, options.smoothing_sigma)
}

/// Collapse exact duplicate (VOC, NOx) pairs, averaging their O3.
fn merge_duplicates(obs: &ObservationSet) -> (Vec<Real>, Vec<Real>, Vec<Real>) {
    let mut acc: BTreeMap<(u64, u64), (Real, Real, Real, usize)> = BTreeMap::new();
    for r in obs.rows() {
        let key = (r.voc_ppb.to_bits(), r.nox_ppb.to_bits());
        let e = acc.entry(key).or_insert((r.voc_ppb, r.nox_ppb, 0.0, 0));
        e.2 += r.o3_ppb;
        e.3 += 1;
    }
    let mut xs = Vec::with_capacity(acc.len());
    let mut ys = Vec::with_capacity(acc.len());
    let mut zs = Vec::with_capacity(acc.len());
    for (x, y, sum, count) in acc.into_values() {
        xs.push(x);
        ys.push(y);
        zs.push(sum / count as Real);
    }
    (xs, ys, zs)
}

fn axis(
    values: &[Real],
    points: usize,
    window: Option<PercentileWindow>,
    name: &str,
) -> EkmaResult<Vec<Real>> {
    let bounds = match window {
        Some(w) => stats::percentile(values, w.lower).zip(stats::percentile(values, w.upper)),
        None => stats::percentile(values, 0.0).zip(stats::percentile(values, 100.0)),
    };
    match bounds {
        Some((lo, hi)) if hi > lo => Ok(linspace(lo, hi, points)),
        _ => Err(EkmaError::insufficient(
            Stage::Interpolate,
            format!("{name} observations span no range"),
        )),
    }
}

fn linear_value(tri: &Triangulation, t: usize, w: [Real; 3], zs: &[Real]) -> Real {
    let v = tri.triangles()[t];
    w[0] * zs[v[0]] + w[1] * zs[v[1]] + w[2] * zs[v[2]]
}

/// Least-squares gradient at each vertex from its triangulation neighbours.
fn vertex_gradients(tri: &Triangulation, zs: &[Real]) -> Vec<Vector2<Real>> {
    let pts = tri.points();
    (0..pts.len())
        .map(|i| {
            let mut ata = Matrix2::zeros();
            let mut atb = Vector2::zeros();
            for j in tri.neighbours(i) {
                let d = Vector2::new(pts[j][0] - pts[i][0], pts[j][1] - pts[i][1]);
                ata += d * d.transpose();
                atb += d * (zs[j] - zs[i]);
            }
            // A vertex with no usable neighbours gets a flat gradient.
            ata.try_inverse().map(|inv| inv * atb).unwrap_or_else(Vector2::zeros)
        })
        .collect()
}

fn cubic_value(
    tri: &Triangulation,
    t: usize,
    w: [Real; 3],
    zs: &[Real],
    grads: &[Vector2<Real>],
) -> Real {
    let v = tri.triangles()[t];
    let p = v.map(|i| Vector2::new(tri.points()[i][0], tri.points()[i][1]));
    let f = v.map(|i| zs[i]);
    let g = v.map(|i| grads[i]);

    // Edge control point next to vertex a, one third of the way toward b.
    let edge = |a: usize, b: usize| f[a] + g[a].dot(&(p[b] - p[a])) / 3.0;
    let b210 = edge(0, 1);
    let b120 = edge(1, 0);
    let b201 = edge(0, 2);
    let b102 = edge(2, 0);
    let b021 = edge(1, 2);
    let b012 = edge(2, 1);
    let e = (b210 + b120 + b201 + b102 + b021 + b012) / 6.0;
    let vmean = (f[0] + f[1] + f[2]) / 3.0;
    let b111 = e + (e - vmean) / 2.0;

    let [u, s, r] = w;
    f[0] * u.powi(3)
        + f[1] * s.powi(3)
        + f[2] * r.powi(3)
        + 3.0 * (b210 * u * u * s + b120 * u * s * s + b201 * u * u * r)
        + 3.0 * (b102 * u * r * r + b021 * s * s * r + b012 * s * r * r)
        + 6.0 * b111 * u * s * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use oz_core::ObservationRow;

    fn plane_set() -> ObservationSet {
        let mut rows = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let voc = 2.0 * i as Real;
                let nox = 1.0 + j as Real;
                rows.push(ObservationRow::new(voc, nox, 3.0 * voc - 2.0 * nox + 40.0));
            }
        }
        ObservationSet::new(rows)
    }

    #[test]
    fn linear_reproduces_plane() {
        let options = InterpolationOptions {
            resolution: Resolution::square(11),
            method: InterpolationMethod::Linear,
            ..InterpolationOptions::default()
        };
        let grid = interpolate(&plane_set(), &options).unwrap();
        assert_eq!(grid.defined_count(), 121);
        for (r, &nox) in grid.nox_axis().iter().enumerate() {
            for (c, &voc) in grid.voc_axis().iter().enumerate() {
                let expected = 3.0 * voc - 2.0 * nox + 40.0;
                assert!((grid.get(r, c).unwrap() - expected).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn cubic_reproduces_plane() {
        let options = InterpolationOptions {
            resolution: Resolution { voc_points: 9, nox_points: 7 },
            ..InterpolationOptions::default()
        };
        let grid = interpolate(&plane_set(), &options).unwrap();
        assert_eq!(grid.shape(), (7, 9));
        for (r, &nox) in grid.nox_axis().iter().enumerate() {
            for (c, &voc) in grid.voc_axis().iter().enumerate() {
                let expected = 3.0 * voc - 2.0 * nox + 40.0;
                let got = grid.get(r, c).unwrap();
                assert!((got - expected).abs() < 1e-6, "({r},{c}) {got} vs {expected}");
            }
        }
    }

    #[test]
    fn outside_hull_is_undefined() {
        // Triangle: the upper-right corner of the bounding box is outside.
        let obs = ObservationSet::new(vec![
            ObservationRow::new(0.0, 0.0, 10.0),
            ObservationRow::new(10.0, 0.0, 20.0),
            ObservationRow::new(0.0, 10.0, 30.0),
        ]);
        let options = InterpolationOptions {
            resolution: Resolution::square(5),
            method: InterpolationMethod::Linear,
            ..InterpolationOptions::default()
        };
        let grid = interpolate(&obs, &options).unwrap();
        assert!(grid.get(0, 0).is_some());
        assert!(grid.get(4, 4).is_none());
        assert!(grid.get(3, 3).is_none());
    }

    #[test]
    fn cells_on_a_flat_hull_edge_are_defined() {
        let obs = ObservationSet::new(vec![
            ObservationRow::new(0.0, 0.0, 10.0),
            ObservationRow::new(50.0, 0.1, 20.0),
            ObservationRow::new(100.0, 0.0, 30.0),
            ObservationRow::new(50.0, 100.0, 40.0),
        ]);
        let options = InterpolationOptions {
            resolution: Resolution::square(5),
            method: InterpolationMethod::Linear,
            ..InterpolationOptions::default()
        };
        let grid = interpolate(&obs, &options).unwrap();
        let row0: Vec<Option<Real>> = (0..5).map(|c| grid.get(0, c)).collect();
        for (c, expected) in [10.0, 15.0, 20.0, 25.0, 30.0].into_iter().enumerate() {
            let got = row0[c].unwrap_or_else(|| panic!("cell (0,{c}) undefined: {row0:?}"));
            assert!((got - expected).abs() < 1e-6, "(0,{c}) {got} vs {expected}");
        }
        // Apex row: only the centre column lies in the hull.
        assert!(grid.get(4, 2).is_some());
        assert!(grid.get(4, 0).is_none());
    }

    #[test]
    fn too_few_points_is_insufficient() {
        let obs = ObservationSet::new(vec![
            ObservationRow::new(0.0, 0.0, 10.0),
            ObservationRow::new(1.0, 1.0, 20.0),
        ]);
        let err = interpolate(&obs, &InterpolationOptions::default()).unwrap_err();
        assert!(matches!(err, EkmaError::InsufficientData { stage: Stage::Interpolate, .. }));
    }

    #[test]
    fn duplicates_do_not_count_as_distinct_points() {
        let obs = ObservationSet::new(vec![
            ObservationRow::new(1.0, 1.0, 10.0),
            ObservationRow::new(1.0, 1.0, 12.0),
            ObservationRow::new(2.0, 2.0, 20.0),
        ]);
        assert!(interpolate(&obs, &InterpolationOptions::default()).is_err());
    }

    #[test]
    fn rejects_bad_resolution_and_window() {
        let mut options = InterpolationOptions {
            resolution: Resolution::square(1),
            ..InterpolationOptions::default()
        };
        assert!(matches!(
            interpolate(&plane_set(), &options),
            Err(EkmaError::InvalidConfiguration { .. })
        ));
        options.resolution = Resolution::square(10);
        options.percentile_window = Some(PercentileWindow { lower: 98.0, upper: 2.0 });
        assert!(interpolate(&plane_set(), &options).is_err());
    }

    #[test]
    fn percentile_window_narrows_axes() {
        let options = InterpolationOptions {
            resolution: Resolution::square(10),
            method: InterpolationMethod::Linear,
            percentile_window: Some(PercentileWindow { lower: 20.0, upper: 80.0 }),
            ..InterpolationOptions::default()
        };
        let grid = interpolate(&plane_set(), &options).unwrap();
        assert!((grid.voc_axis()[0] - 2.0).abs() < 1e-12);
        assert!((grid.voc_axis()[9] - 8.0).abs() < 1e-12);
        // Narrowed axes sit inside the hull, so every cell is defined.
        assert_eq!(grid.defined_count(), 100);
    }
}
