//! Chemical regime classification.
//!
//! Two indicators are available:
//! - ridge slope: mean |dNOx/dVOC| along the ridge, compared against two
//!   configured thresholds
//! - VOC/NOx ratio: median ratio of the observations

use crate::error::{EkmaError, EkmaResult, Stage};
use crate::ridge::RidgeCurve;
use oz_core::{ObservationSet, Real, stats};
use std::fmt;

/// O3 formation regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    VocLimited,
    NoxLimited,
    Transition,
    /// Slope (or ratio) could not be computed.
    Undetermined,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VocLimited => "VOC-limited",
            Self::NoxLimited => "NOx-limited",
            Self::Transition => "Transition",
            Self::Undetermined => "Undetermined",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Slope thresholds for ridge-based classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeThresholds {
    /// Mean |slope| above this is VOC-limited.
    pub voc_limited_min: Real,
    /// Mean |slope| below this is NOx-limited.
    pub nox_limited_max: Real,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            voc_limited_min: 5.0,
            nox_limited_max: 1.0,
        }
    }
}

impl RegimeThresholds {
    pub fn new(voc_limited_min: Real, nox_limited_max: Real) -> EkmaResult<Self> {
        let t = Self {
            voc_limited_min,
            nox_limited_max,
        };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> EkmaResult<()> {
        let finite = self.voc_limited_min.is_finite() && self.nox_limited_max.is_finite();
        if !finite || self.nox_limited_max < 0.0 {
            return Err(EkmaError::invalid(
                Stage::Classify,
                "slope thresholds must be finite and non-negative",
            ));
        }
        if self.voc_limited_min < self.nox_limited_max {
            return Err(EkmaError::invalid(
                Stage::Classify,
                format!(
                    "voc_limited_min ({}) must not be below nox_limited_max ({})",
                    self.voc_limited_min, self.nox_limited_max
                ),
            ));
        }
        Ok(())
    }

    fn decide(&self, mean_abs_slope: Real) -> Regime {
        if mean_abs_slope > self.voc_limited_min {
            Regime::VocLimited
        } else if mean_abs_slope < self.nox_limited_max {
            Regime::NoxLimited
        } else {
            Regime::Transition
        }
    }
}

/// Mean absolute ridge slope over finite slopes.
pub fn mean_abs_slope(ridge: &RidgeCurve) -> Option<Real> {
    let abs: Vec<Real> = ridge.slopes().iter().map(|s| s.abs()).collect();
    stats::mean(&abs)
}

/// Classify the whole ridge.
pub fn classify(ridge: &RidgeCurve, thresholds: &RegimeThresholds) -> Regime {
    if ridge.len() < 2 {
        return Regime::Undetermined;
    }
    match mean_abs_slope(ridge) {
        Some(m) => thresholds.decide(m),
        None => Regime::Undetermined,
    }
}

/// Regime of one contiguous stretch of the ridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeSegment {
    pub voc_start: Real,
    pub voc_end: Real,
    pub mean_abs_slope: Option<Real>,
    pub regime: Regime,
}

/// Classify consecutive windows of `window` ridge points (the last window
/// shares its first point with the previous one).
pub fn classify_segments(
    ridge: &RidgeCurve,
    thresholds: &RegimeThresholds,
    window: usize,
) -> EkmaResult<Vec<RegimeSegment>> {
    if window < 2 {
        return Err(EkmaError::invalid(
            Stage::Classify,
            format!("segment window must hold at least 2 ridge points (got {window})"),
        ));
    }
    let pts = ridge.points();
    if pts.len() < 2 {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut start = 0;
    while start + 1 < pts.len() {
        let end = (start + window).min(pts.len());
        let sub = RidgeCurve::new(pts[start..end].to_vec());
        segments.push(RegimeSegment {
            voc_start: pts[start].voc,
            voc_end: pts[end - 1].voc,
            mean_abs_slope: mean_abs_slope(&sub),
            regime: classify(&sub, thresholds),
        });
        start = end - 1;
    }
    Ok(segments)
}

/// Median VOC/NOx ratio thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioThresholds {
    /// Median ratio below this is VOC-limited.
    pub voc_limited_below: Real,
    /// Median ratio above this is NOx-limited.
    pub nox_limited_above: Real,
}

impl Default for RatioThresholds {
    fn default() -> Self {
        Self {
            voc_limited_below: 4.0,
            nox_limited_above: 10.0,
        }
    }
}

/// Classify from the median VOC/NOx ratio of valid observations.
pub fn classify_by_ratio(observations: &ObservationSet, thresholds: &RatioThresholds) -> Regime {
    let ratios: Vec<Real> = observations
        .cleaned()
        .rows()
        .iter()
        .filter_map(|r| r.voc_nox_ratio())
        .filter(|r| r.is_finite())
        .collect();
    match stats::median(&ratios) {
        Some(m) if m < thresholds.voc_limited_below => Regime::VocLimited,
        Some(m) if m > thresholds.nox_limited_above => Regime::NoxLimited,
        Some(_) => Regime::Transition,
        None => Regime::Undetermined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ridge::RidgePoint;
    use oz_core::ObservationRow;

    fn ridge_with_slope(slope: Real, n: usize) -> RidgeCurve {
        RidgeCurve::new(
            (0..n)
                .map(|i| RidgePoint {
                    voc: i as Real,
                    nox: 1.0 + slope * i as Real,
                    o3: 50.0,
                })
                .collect(),
        )
    }

    #[test]
    fn steep_ridge_is_voc_limited() {
        let t = RegimeThresholds::default();
        assert_eq!(classify(&ridge_with_slope(8.0, 5), &t), Regime::VocLimited);
        assert_eq!(classify(&ridge_with_slope(-8.0, 5), &t), Regime::VocLimited);
    }

    #[test]
    fn flat_ridge_is_nox_limited() {
        let t = RegimeThresholds::default();
        assert_eq!(classify(&ridge_with_slope(0.2, 5), &t), Regime::NoxLimited);
    }

    #[test]
    fn middle_slope_is_transition() {
        let t = RegimeThresholds::default();
        assert_eq!(classify(&ridge_with_slope(2.0, 5), &t), Regime::Transition);
    }

    #[test]
    fn short_ridge_is_undetermined() {
        let t = RegimeThresholds::default();
        assert_eq!(classify(&ridge_with_slope(2.0, 1), &t), Regime::Undetermined);
        assert_eq!(classify(&RidgeCurve::default(), &t), Regime::Undetermined);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = RegimeThresholds::new(0.5, 3.0).unwrap_err();
        assert_eq!(err.stage(), Stage::Classify);
        assert!(RegimeThresholds::new(3.0, 0.8).is_ok());
    }

    #[test]
    fn segments_cover_ridge() {
        let mut pts: Vec<RidgePoint> = ridge_with_slope(8.0, 4).points().to_vec();
        let last = *pts.last().unwrap();
        for i in 1..4 {
            pts.push(RidgePoint {
                voc: last.voc + i as Real,
                nox: last.nox + 0.1 * i as Real,
                o3: 50.0,
            });
        }
        let ridge = RidgeCurve::new(pts);
        let segs = classify_segments(&ridge, &RegimeThresholds::default(), 4).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].regime, Regime::VocLimited);
        assert_eq!(segs[1].regime, Regime::NoxLimited);
        assert_eq!(segs[0].voc_end, segs[1].voc_start);
        assert!(classify_segments(&ridge, &RegimeThresholds::default(), 1).is_err());
    }

    #[test]
    fn ratio_indicator() {
        let t = RatioThresholds::default();
        let low: ObservationSet = [2.0, 3.0, 3.5]
            .iter()
            .map(|r| ObservationRow::new(r * 10.0, 10.0, 40.0))
            .collect();
        assert_eq!(classify_by_ratio(&low, &t), Regime::VocLimited);

        let high: ObservationSet = [12.0, 15.0, 20.0]
            .iter()
            .map(|r| ObservationRow::new(r * 10.0, 10.0, 40.0))
            .collect();
        assert_eq!(classify_by_ratio(&high, &t), Regime::NoxLimited);

        assert_eq!(classify_by_ratio(&ObservationSet::default(), &t), Regime::Undetermined);
    }
}
