//! Delaunay triangulation of scattered (VOC, NOx) points.
//!
//! Bowyer-Watson insertion. Points are rescaled to the unit square before
//! triangulating so that VOC and NOx magnitudes do not skew the triangle
//! shapes; barycentric weights are affine invariant, so interpolation results
//! are expressed in the rescaled frame throughout.
//!
//! Dropping the super-triangle can leave thin gaps along the convex hull (a
//! hull triangle whose circumcircle reached a super vertex is never built).
//! A closing pass fills those gaps, so every point on or inside the hull lies
//! in some triangle.

use crate::error::{EkmaError, EkmaResult, Stage};
use oz_core::Real;
use std::collections::HashSet;

/// Relative slack for point-in-triangle tests on hull edges.
const BARY_EPS: Real = 1e-10;

/// Orientation threshold in the unit frame.
const ORIENT_EPS: Real = 1e-12;

/// Distance of the super-triangle vertices from the unit square.
const SUPER_MARGIN: Real = 1e4;

#[derive(Debug, Clone, Copy)]
struct Circle {
    cx: Real,
    cy: Real,
    r2: Real,
}

#[derive(Debug, Clone, Copy)]
struct WorkTriangle {
    v: [usize; 3],
    circle: Circle,
}

/// Triangulated point cloud in unit-square coordinates.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[Real; 2]>,
    triangles: Vec<[usize; 3]>,
    origin: [Real; 2],
    scale: [Real; 2],
}

fn orient(a: [Real; 2], b: [Real; 2], c: [Real; 2]) -> Real {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn circumcircle(a: [Real; 2], b: [Real; 2], c: [Real; 2]) -> Option<Circle> {
    let d = 2.0 * orient(a, b, c);
    if d.abs() < Real::EPSILON {
        return None;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let cx = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let cy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    let r2 = (a[0] - cx).powi(2) + (a[1] - cy).powi(2);
    Some(Circle { cx, cy, r2 })
}

impl Triangulation {
    /// Triangulate raw `(voc, nox)` points.
    ///
    /// Fails when fewer than three distinct points remain or all of them are
    /// collinear.
    pub fn new(raw: &[[Real; 2]]) -> EkmaResult<Self> {
        if raw.len() < 3 {
            return Err(EkmaError::insufficient(
                Stage::Interpolate,
                format!("fewer than 3 observations ({} given)", raw.len()),
            ));
        }

        let (mut lo, mut hi) = ([Real::INFINITY; 2], [Real::NEG_INFINITY; 2]);
        for p in raw {
            for k in 0..2 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        let scale = [hi[0] - lo[0], hi[1] - lo[1]];
        if scale[0] <= 0.0 || scale[1] <= 0.0 {
            return Err(EkmaError::insufficient(
                Stage::Interpolate,
                "fewer than 3 non-collinear observations (one axis has no spread)",
            ));
        }

        let points: Vec<[Real; 2]> = raw
            .iter()
            .map(|p| [(p[0] - lo[0]) / scale[0], (p[1] - lo[1]) / scale[1]])
            .collect();

        if !has_three_non_collinear(&points) {
            return Err(EkmaError::insufficient(
                Stage::Interpolate,
                "fewer than 3 non-collinear observations",
            ));
        }

        let mut triangles = bowyer_watson(&points);
        fill_hull(&points, &mut triangles);
        if triangles.is_empty() {
            return Err(EkmaError::insufficient(
                Stage::Interpolate,
                "triangulation produced no triangles",
            ));
        }

        Ok(Self {
            points,
            triangles,
            origin: lo,
            scale,
        })
    }

    pub fn points(&self) -> &[[Real; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Map a raw `(voc, nox)` coordinate into the unit-square frame.
    pub fn to_unit(&self, voc: Real, nox: Real) -> [Real; 2] {
        [
            (voc - self.origin[0]) / self.scale[0],
            (nox - self.origin[1]) / self.scale[1],
        ]
    }

    /// Find a triangle containing `p` (unit frame) and its barycentric weights.
    pub fn locate(&self, p: [Real; 2]) -> Option<(usize, [Real; 3])> {
        self.triangles.iter().enumerate().find_map(|(t, tri)| {
            let [a, b, c] = tri.map(|i| self.points[i]);
            let area = orient(a, b, c);
            if area.abs() < Real::EPSILON {
                return None;
            }
            let w0 = orient(b, c, p) / area;
            let w1 = orient(c, a, p) / area;
            let w2 = orient(a, b, p) / area;
            if w0 >= -BARY_EPS && w1 >= -BARY_EPS && w2 >= -BARY_EPS {
                Some((t, [w0, w1, w2]))
            } else {
                None
            }
        })
    }

    /// Indices of vertices sharing a triangle with `vertex`.
    pub fn neighbours(&self, vertex: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .triangles
            .iter()
            .filter(|t| t.contains(&vertex))
            .flat_map(|t| t.iter().copied())
            .filter(|&v| v != vertex)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn has_three_non_collinear(points: &[[Real; 2]]) -> bool {
    let a = points[0];
    let Some(b) = points.iter().copied().find(|p| (p[0] - a[0]).hypot(p[1] - a[1]) > 1e-12) else {
        return false;
    };
    points.iter().any(|&c| orient(a, b, c).abs() > 1e-12)
}

fn bowyer_watson(points: &[[Real; 2]]) -> Vec<[usize; 3]> {
    let n = points.len();
    // Super-triangle enclosing the unit square with a wide margin.
    let mut verts: Vec<[Real; 2]> = points.to_vec();
    verts.push([-SUPER_MARGIN, -SUPER_MARGIN]);
    verts.push([2.0 * SUPER_MARGIN + 1.0, -SUPER_MARGIN]);
    verts.push([-SUPER_MARGIN, 2.0 * SUPER_MARGIN + 1.0]);

    let mut tris: Vec<WorkTriangle> = Vec::new();
    let super_v = [n, n + 1, n + 2];
    if let Some(circle) = circumcircle(verts[n], verts[n + 1], verts[n + 2]) {
        tris.push(WorkTriangle { v: super_v, circle });
    }

    for (i, &p) in points.iter().enumerate() {
        let mut bad = Vec::new();
        tris.retain(|t| {
            let d2 = (p[0] - t.circle.cx).powi(2) + (p[1] - t.circle.cy).powi(2);
            if d2 < t.circle.r2 {
                bad.push(t.v);
                false
            } else {
                true
            }
        });

        // Cavity boundary: edges used by exactly one removed triangle.
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for t in &bad {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                if let Some(pos) = edges
                    .iter()
                    .position(|&(x, y)| (x == b && y == a) || (x == a && y == b))
                {
                    edges.swap_remove(pos);
                } else {
                    edges.push((a, b));
                }
            }
        }

        for (a, b) in edges {
            let (pa, pb) = (verts[a], verts[b]);
            let v = if orient(pa, pb, p) > 0.0 { [a, b, i] } else { [b, a, i] };
            if let Some(circle) = circumcircle(verts[v[0]], verts[v[1]], verts[v[2]]) {
                tris.push(WorkTriangle { v, circle });
            }
        }
    }

    tris.into_iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .map(|t| t.v)
        .collect()
}

/// Directed boundary edges, interior on the left.
fn boundary_edges(tris: &[[usize; 3]]) -> Vec<(usize, usize)> {
    let directed: HashSet<(usize, usize)> = tris
        .iter()
        .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
        .collect();
    let mut edges: Vec<(usize, usize)> = directed
        .iter()
        .copied()
        .filter(|&(a, b)| !directed.contains(&(b, a)))
        .collect();
    edges.sort_unstable();
    edges
}

/// `cand` (counter-clockwise) has a positive area, holds no other point and
/// overlaps no existing triangle.
fn can_add(points: &[[Real; 2]], tris: &[[usize; 3]], cand: [usize; 3]) -> bool {
    let [a, b, c] = cand.map(|i| points[i]);
    if orient(a, b, c) <= ORIENT_EPS {
        return false;
    }
    let inside = |p: [Real; 2]| {
        orient(a, b, p) > ORIENT_EPS && orient(b, c, p) > ORIENT_EPS && orient(c, a, p) > ORIENT_EPS
    };
    if points
        .iter()
        .enumerate()
        .any(|(i, &p)| !cand.contains(&i) && p != a && p != b && p != c && inside(p))
    {
        return false;
    }
    tris.iter().all(|t| {
        let other = t.map(|i| points[i]);
        separated(&[a, b, c], &other) || separated(&other, &[a, b, c])
    })
}

/// Some edge of counter-clockwise `tri` has every vertex of `other` on or
/// beyond it.
fn separated(tri: &[[Real; 2]; 3], other: &[[Real; 2]; 3]) -> bool {
    (0..3).any(|k| {
        let (p, q) = (tri[k], tri[(k + 1) % 3]);
        other.iter().all(|&r| orient(p, q, r) <= ORIENT_EPS)
    })
}

/// Grow the mesh until its boundary is the convex hull.
///
/// Each step adds one triangle: first a reflex boundary vertex is closed
/// off, otherwise a point left out of every triangle is joined to a boundary
/// edge it sees.
fn fill_hull(points: &[[Real; 2]], tris: &mut Vec<[usize; 3]>) {
    for _ in 0..(2 * points.len() + 8) {
        let boundary = boundary_edges(tris);
        let notch = boundary.iter().find_map(|&(a, b)| {
            boundary
                .iter()
                .filter(|&&(from, c)| from == b && c != a)
                .map(|&(_, c)| [a, c, b])
                .find(|&cand| {
                    orient(points[a], points[b], points[cand[1]]) < -ORIENT_EPS
                        && can_add(points, tris.as_slice(), cand)
                })
        });
        if let Some(t) = notch {
            tris.push(t);
            continue;
        }

        let used: HashSet<usize> = tris.iter().flatten().copied().collect();
        let stray = (0..points.len())
            .filter(|q| !used.contains(q))
            .find_map(|q| {
                boundary
                    .iter()
                    .filter(|&&(a, b)| orient(points[a], points[b], points[q]) < -ORIENT_EPS)
                    .map(|&(a, b)| [b, a, q])
                    .find(|&cand| can_add(points, tris.as_slice(), cand))
            });
        match stray {
            Some(t) => tris.push(t),
            None => break,
        }
    }
}
