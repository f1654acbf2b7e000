//! Stored result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub config_name: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub kind: RunKind,
    pub tool_version: String,
}

impl RunManifest {
    /// Manifest stamped with the current time.
    pub fn now(run_id: RunId, config_name: &str, kind: RunKind, tool_version: &str) -> Self {
        Self {
            run_id,
            config_name: config_name.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
            tool_version: tool_version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunKind {
    Ekma {
        voc_points: usize,
        nox_points: usize,
        method: String,
        observations: usize,
    },
    Rir {
        strategy: String,
        scenarios: usize,
    },
}

impl RunKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ekma { .. } => "ekma",
            Self::Rir { .. } => "rir",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunPayload {
    Ekma(EkmaRecord),
    Rir(RirRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EkmaRecord {
    pub voc_axis: Vec<f64>,
    pub nox_axis: Vec<f64>,
    /// Row-major, one row per NOx level; `null` marks undefined cells.
    pub o3: Vec<Vec<Option<f64>>>,
    pub ridge: Vec<RidgePointRecord>,
    pub regime: String,
    pub mean_abs_slope: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_regime: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RidgePointRecord {
    pub voc: f64,
    pub nox: f64,
    pub o3: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentRecord {
    pub voc_start: f64,
    pub voc_end: f64,
    pub mean_abs_slope: Option<f64>,
    pub regime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RirRecord {
    /// `FINITE_DIFFERENCE`, `CORRELATION` or `FALLBACK_DEFAULT`.
    pub method: String,
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reductions: Vec<ReductionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRecord {
    pub id: String,
    pub status: String,
    pub max_o3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_o3_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReductionRecord {
    pub label: String,
    pub factor: f64,
    pub rir: Option<f64>,
}
