//! Species concentration tables and the solver's plain-text input format.
//!
//! The text format is one `species value` pair per line. Blank lines and
//! lines starting with `#` are ignored; a leading time column
//! (`time species value`) is accepted and dropped when parsing.

use crate::error::{RirError, RirResult};
use oz_core::Real;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// ppb to molecules cm^-3 at 25 °C and 1 atm.
pub const PPB_TO_MOLECULES_CM3: Real = 2.46e10;

/// Mapping from species name to a non-negative concentration.
///
/// The unit is a caller contract and is never mixed within one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcentrationTable {
    values: BTreeMap<String, Real>,
}

impl ConcentrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(species, value)` pairs, rejecting invalid values.
    pub fn from_pairs<I, S>(pairs: I) -> RirResult<Self>
    where
        I: IntoIterator<Item = (S, Real)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (species, value) in pairs {
            table.insert(species, value)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, species: impl Into<String>, value: Real) -> RirResult<()> {
        let species = species.into();
        if species.trim().is_empty() || species.chars().any(char::is_whitespace) {
            return Err(RirError::invalid(format!(
                "species name {species:?} must be non-empty without whitespace"
            )));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(RirError::invalid(format!(
                "concentration of {species} must be finite and >= 0 (got {value})"
            )));
        }
        self.values.insert(species, value);
        Ok(())
    }

    pub fn get(&self, species: &str) -> Option<Real> {
        self.values.get(species).copied()
    }

    pub fn contains(&self, species: &str) -> bool {
        self.values.contains_key(species)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Real)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Fail with `UnknownSpecies` for the first group member not in the table.
    pub fn check_group(&self, group: &[String]) -> RirResult<()> {
        if group.is_empty() {
            return Err(RirError::invalid("species group is empty"));
        }
        match group.iter().find(|s| !self.contains(s)) {
            Some(missing) => Err(RirError::unknown(missing)),
            None => Ok(()),
        }
    }

    /// Summed concentration of a species group.
    pub fn total(&self, group: &[String]) -> RirResult<Real> {
        self.check_group(group)?;
        Ok(group.iter().filter_map(|s| self.get(s)).sum())
    }

    /// Copy of the table with every member of `group` multiplied by `factor`.
    pub fn scaled(&self, group: &[String], factor: Real) -> RirResult<Self> {
        self.check_group(group)?;
        if !factor.is_finite() || factor < 0.0 {
            return Err(RirError::invalid(format!(
                "scale factor must be finite and >= 0 (got {factor})"
            )));
        }
        let mut out = self.clone();
        for species in group {
            if let Some(v) = out.values.get_mut(species) {
                *v *= factor;
            }
        }
        Ok(out)
    }

    /// Render as solver input, optionally multiplying every value by `conversion`.
    pub fn to_config_text(&self, conversion: Option<Real>) -> String {
        let k = conversion.unwrap_or(1.0);
        let mut out = String::new();
        for (species, value) in &self.values {
            let _ = writeln!(out, "{species} {}", value * k);
        }
        out
    }

    pub fn parse_config_text(text: &str) -> RirResult<Self> {
        let mut table = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (species, raw) = match fields.as_slice() {
                [species, value] => (*species, *value),
                [_time, species, value] => (*species, *value),
                _ => {
                    return Err(RirError::invalid(format!(
                        "line {}: expected `species value`, got {line:?}",
                        lineno + 1
                    )));
                }
            };
            let value: Real = raw.parse().map_err(|_| {
                RirError::invalid(format!("line {}: bad number {raw:?}", lineno + 1))
            })?;
            if table.contains(species) {
                return Err(RirError::invalid(format!(
                    "line {}: duplicate species {species}",
                    lineno + 1
                )));
            }
            table.insert(species, value)?;
        }
        Ok(table)
    }
}
