//! Regular VOC x NOx surface.

use crate::error::{EkmaError, EkmaResult, Stage};
use nalgebra::DMatrix;
use oz_core::{Real, is_strictly_increasing};

/// Gridded O3 surface.
///
/// Rows follow `nox_axis`, columns follow `voc_axis`. A cell holding `None`
/// lies outside the observation hull (or was never computed) and must not be
/// read as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    voc_axis: Vec<Real>,
    nox_axis: Vec<Real>,
    o3: DMatrix<Option<Real>>,
}

impl Grid {
    /// Build a grid, checking axis monotonicity and shape.
    pub fn new(
        voc_axis: Vec<Real>,
        nox_axis: Vec<Real>,
        o3: DMatrix<Option<Real>>,
    ) -> EkmaResult<Self> {
        if !is_strictly_increasing(&voc_axis) || !is_strictly_increasing(&nox_axis) {
            return Err(EkmaError::invalid(
                Stage::Interpolate,
                "grid axes must be strictly increasing",
            ));
        }
        if o3.nrows() != nox_axis.len() || o3.ncols() != voc_axis.len() {
            return Err(EkmaError::invalid(
                Stage::Interpolate,
                format!(
                    "surface shape {}x{} does not match axes {}x{}",
                    o3.nrows(),
                    o3.ncols(),
                    nox_axis.len(),
                    voc_axis.len()
                ),
            ));
        }
        if o3.iter().flatten().any(|v| !v.is_finite()) {
            return Err(EkmaError::invalid(
                Stage::Interpolate,
                "defined cells must be finite",
            ));
        }
        Ok(Self {
            voc_axis,
            nox_axis,
            o3,
        })
    }

    pub fn voc_axis(&self) -> &[Real] {
        &self.voc_axis
    }

    pub fn nox_axis(&self) -> &[Real] {
        &self.nox_axis
    }

    /// `(nox rows, voc cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.o3.shape()
    }

    pub fn get(&self, nox_index: usize, voc_index: usize) -> Option<Real> {
        self.o3.get((nox_index, voc_index)).copied().flatten()
    }

    pub fn values(&self) -> &DMatrix<Option<Real>> {
        &self.o3
    }

    /// Cells of one VOC column, ordered by increasing NOx.
    pub fn column(&self, voc_index: usize) -> impl Iterator<Item = Option<Real>> + '_ {
        (0..self.o3.nrows()).map(move |row| self.o3[(row, voc_index)])
    }

    pub fn defined_count(&self) -> usize {
        self.o3.iter().filter(|v| v.is_some()).count()
    }

    /// Min and max over defined cells.
    pub fn value_range(&self) -> Option<(Real, Real)> {
        self.o3.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    pub(crate) fn with_values(&self, o3: DMatrix<Option<Real>>) -> Self {
        Self {
            voc_axis: self.voc_axis.clone(),
            nox_axis: self.nox_axis.clone(),
            o3,
        }
    }
}
