//! oz-ekma: isopleth surfaces, ridge lines and chemical regimes.
//!
//! Provides:
//! - `Grid`: a regular VOC x NOx surface with explicit undefined cells
//! - Delaunay-based scattered interpolation (linear and cubic)
//! - Undefined-aware Gaussian smoothing
//! - Ridge extraction (NOx maximizing O3 per VOC column)
//! - Regime classification from ridge slopes or VOC/NOx ratios
//!
//! # Example
//!
//! ```
//! use oz_core::{ObservationRow, ObservationSet};
//! use oz_ekma::{InterpolationOptions, RegimeThresholds, Resolution, classify, extract_ridge, interpolate};
//!
//! let obs: ObservationSet = [(1.0, 1.0, 10.0), (9.0, 1.0, 30.0), (1.0, 9.0, 5.0), (9.0, 9.0, 60.0)]
//!     .iter()
//!     .map(|&(v, n, o)| ObservationRow::new(v, n, o))
//!     .collect();
//! let options = InterpolationOptions {
//!     resolution: Resolution::square(20),
//!     ..InterpolationOptions::default()
//! };
//! let grid = interpolate(&obs, &options).unwrap();
//! let ridge = extract_ridge(&grid);
//! let regime = classify(&ridge, &RegimeThresholds::default());
//! println!("{regime}");
//! ```

pub mod error;
pub mod grid;
pub mod interpolate;
pub mod regime;
pub mod ridge;
pub mod smoothing;
pub mod triangulation;

pub use error::{EkmaError, EkmaResult, Stage};
pub use grid::Grid;
pub use interpolate::{InterpolationMethod, InterpolationOptions, PercentileWindow, Resolution, interpolate};
pub use regime::{
    RatioThresholds, Regime, RegimeSegment, RegimeThresholds, classify, classify_by_ratio,
    classify_segments, mean_abs_slope,
};
pub use ridge::{RidgeCurve, RidgePoint, extract_ridge};
pub use smoothing::gaussian_smooth;
pub use triangulation::Triangulation;
