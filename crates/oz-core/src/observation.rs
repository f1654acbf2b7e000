//! Normalized observation rows.
//!
//! Column-name normalization happens upstream; this module only sees the
//! canonical `(VOC, NOx, O3)` shape in ppb.

use crate::{Real, stats};
use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One `(VOC, NOx, O3)` sample in ppb.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationRow {
    #[cfg_attr(feature = "serde", serde(rename = "VOC_ppb", alias = "voc_ppb"))]
    pub voc_ppb: Real,
    #[cfg_attr(feature = "serde", serde(rename = "NOx_ppb", alias = "nox_ppb"))]
    pub nox_ppb: Real,
    #[cfg_attr(feature = "serde", serde(rename = "O3_ppb", alias = "o3_ppb"))]
    pub o3_ppb: Real,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub timestamp: Option<NaiveDateTime>,
}

impl ObservationRow {
    pub fn new(voc_ppb: Real, nox_ppb: Real, o3_ppb: Real) -> Self {
        Self {
            voc_ppb,
            nox_ppb,
            o3_ppb,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Finite and non-negative in all three species.
    pub fn is_valid(&self) -> bool {
        [self.voc_ppb, self.nox_ppb, self.o3_ppb]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn voc_nox_ratio(&self) -> Option<Real> {
        if self.nox_ppb > 0.0 {
            Some(self.voc_ppb / self.nox_ppb)
        } else {
            None
        }
    }
}

/// Unordered collection of observation rows.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ObservationSet {
    rows: Vec<ObservationRow>,
}

impl ObservationSet {
    pub fn new(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn voc(&self) -> Vec<Real> {
        self.rows.iter().map(|r| r.voc_ppb).collect()
    }

    pub fn nox(&self) -> Vec<Real> {
        self.rows.iter().map(|r| r.nox_ppb).collect()
    }

    pub fn o3(&self) -> Vec<Real> {
        self.rows.iter().map(|r| r.o3_ppb).collect()
    }

    /// Drop rows with missing, non-finite or negative values.
    pub fn cleaned(&self) -> Self {
        Self::new(self.rows.iter().filter(|r| r.is_valid()).cloned().collect())
    }

    /// Keep rows whose O3 lies inside `[q1 - k*iqr, q3 + k*iqr]`.
    pub fn filter_o3_iqr(&self, multiplier: Real) -> Self {
        let Some((lo, hi)) = stats::iqr_bounds(&self.o3(), multiplier) else {
            return Self::default();
        };
        Self::new(
            self.rows
                .iter()
                .filter(|r| r.o3_ppb >= lo && r.o3_ppb <= hi)
                .cloned()
                .collect(),
        )
    }

    /// Rows in time order; rows without a timestamp sort last, stable.
    pub fn sorted_by_time(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Self::new(rows)
    }
}

impl FromIterator<ObservationRow> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = ObservationRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
