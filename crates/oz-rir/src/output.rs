//! Parser for the solver's species time-series output.
//!
//! The first non-comment line is a header naming the columns. Columns are
//! separated by commas when the header contains one, whitespace otherwise.

use oz_core::Real;

/// O3 samples read from one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct O3Series {
    times: Option<Vec<Real>>,
    values: Vec<Real>,
}

impl O3Series {
    pub fn new(values: Vec<Real>, times: Option<Vec<Real>>) -> Self {
        Self { times, values }
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn times(&self) -> Option<&[Real]> {
        self.times.as_deref()
    }

    /// Maximum O3 and, if known, the time of its first occurrence.
    pub fn peak(&self) -> Option<(Real, Option<Real>)> {
        let mut best: Option<(usize, Real)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, v)| {
            let t = self.times.as_ref().and_then(|ts| ts.get(i).copied());
            (v, t)
        })
    }

    /// Divide every sample by `factor` (undo an input unit conversion).
    pub fn rescaled(mut self, factor: Real) -> Self {
        for v in &mut self.values {
            *v /= factor;
        }
        self
    }
}

fn split(line: &str, comma: bool) -> Vec<&str> {
    if comma {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Extract the `o3_column` series (and `time_column`, when present).
///
/// Rows whose O3 field does not parse are skipped; a missing O3 column is an
/// error, a missing time column is not.
pub fn parse_output(
    text: &str,
    o3_column: &str,
    time_column: Option<&str>,
) -> Result<O3Series, String> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let header = lines.next().ok_or_else(|| "output is empty".to_string())?;
    let comma = header.contains(',');
    let columns = split(header, comma);
    let o3_idx = columns
        .iter()
        .position(|c| *c == o3_column)
        .ok_or_else(|| format!("column {o3_column} not found in output header"))?;
    let time_idx = time_column.and_then(|t| columns.iter().position(|c| *c == t));

    let mut values = Vec::new();
    let mut times = Vec::new();
    for line in lines {
        let fields = split(line, comma);
        let Some(v) = fields.get(o3_idx).and_then(|f| f.parse::<Real>().ok()) else {
            continue;
        };
        if let Some(ti) = time_idx {
            let t = fields
                .get(ti)
                .and_then(|f| f.parse::<Real>().ok())
                .unwrap_or(Real::NAN);
            times.push(t);
        }
        values.push(v);
    }

    if values.is_empty() {
        return Err(format!("no {o3_column} samples in output"));
    }
    Ok(O3Series::new(values, time_idx.map(|_| times)))
}
