//! oz-core: stable foundation for ozone sensitivity analysis.
//!
//! Contains:
//! - numeric (Real, tolerance, axis helpers)
//! - stats (percentiles, IQR filtering, rank correlation)
//! - observation (normalized VOC/NOx/O3 rows)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod observation;
pub mod stats;

pub use error::{OzError, OzResult};
pub use numeric::*;
pub use observation::{ObservationRow, ObservationSet};
