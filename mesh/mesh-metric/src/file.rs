//! Point-metric file classification and parsing.
//!
//! The format is line-oriented text. Fields are separated by whitespace,
//! commas or semicolons; `#` starts a comment. Data lines are
//!
//! ```text
//! 1 x y z        s0 d0 d1 [alpha]    # point source
//! 2 x0 y0 z0 c0  x1 y1 z1 c1  s0 d0 d1 [alpha]    # segment source
//! ```
//!
//! so the arity alone identifies the variant: 7 or 12 fields for the
//! distance metric, 8 or 13 for the singular metric. A file mixing the two,
//! or containing any other arity, has no metric type and is rejected.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MetricError, MetricResult};
use crate::source::MetricSource;

/// Variant of a point-metric file, as decided by line arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Quadratic-blend distance metric (7/12 fields per line).
    Distance,
    /// Power-law singular metric (8/13 fields per line).
    Singular,
    /// Empty file, mixed arities, or an arity that matches neither variant.
    Unknown,
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|s| !s.is_empty())
        .collect()
}

fn data_line(raw: &str) -> Option<&str> {
    let line = match raw.find('#') {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Classify a point-metric file by line arity without fully parsing it.
///
/// # Errors
///
/// Fails only on I/O; an unreadable structure is reported as
/// [`MetricType::Unknown`], not as an error, so callers decide how to fail.
pub fn check_metric_type(path: impl AsRef<Path>) -> MetricResult<MetricType> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut seen = MetricType::Unknown;
    for raw in reader.lines() {
        let raw = raw?;
        let Some(line) = data_line(&raw) else {
            continue;
        };
        let this = match split_fields(line).len() {
            7 | 12 => MetricType::Distance,
            8 | 13 => MetricType::Singular,
            _ => return Ok(MetricType::Unknown),
        };
        if seen == MetricType::Unknown {
            seen = this;
        } else if seen != this {
            return Ok(MetricType::Unknown);
        }
    }
    Ok(seen)
}

struct LineContext<'a> {
    path: &'a Path,
    line: usize,
}

impl LineContext<'_> {
    fn err(&self, reason: impl Into<String>) -> MetricError {
        MetricError::MalformedLine {
            path: self.path.to_path_buf(),
            line: self.line,
            reason: reason.into(),
        }
    }

    fn float(&self, fields: &[&str], idx: usize) -> MetricResult<f64> {
        fields[idx]
            .parse::<f64>()
            .map_err(|_| self.err(format!("field {}: not a number: {:?}", idx + 1, fields[idx])))
    }

    fn flag(&self, fields: &[&str], idx: usize) -> MetricResult<bool> {
        match fields[idx] {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(self.err(format!("field {}: endpoint flag must be 0 or 1, got {other:?}", idx + 1))),
        }
    }
}

/// Parse every data line of a point-metric file into sources.
///
/// `expect_alpha` matches the file's classified variant; the caller has
/// already run [`check_metric_type`] so arities are consistent.
pub(crate) fn parse_sources(
    path: &Path,
    expect_alpha: bool,
) -> MetricResult<Vec<MetricSource>> {
    let reader = BufReader::new(File::open(path)?);
    let mut sources = Vec::new();
    for (idx, raw) in reader.lines().enumerate() {
        let raw = raw?;
        let Some(line) = data_line(&raw) else {
            continue;
        };
        let ctx = LineContext {
            path,
            line: idx + 1,
        };
        let fields = split_fields(line);
        let arity = fields.len();
        let (kind, expected) = match fields[0] {
            "1" => ("point", if expect_alpha { 8 } else { 7 }),
            "2" => ("segment", if expect_alpha { 13 } else { 12 }),
            other => {
                return Err(ctx.err(format!("source type must be 1 or 2, got {other:?}")));
            }
        };
        if arity != expected {
            return Err(ctx.err(format!(
                "{kind} source needs {expected} fields, got {arity}"
            )));
        }
        let tail = arity - if expect_alpha { 4 } else { 3 };
        let size0 = ctx.float(&fields, tail)?;
        let d0 = ctx.float(&fields, tail + 1)?;
        let d1 = ctx.float(&fields, tail + 2)?;
        let alpha = if expect_alpha {
            let a = ctx.float(&fields, tail + 3)?;
            if a <= 0.0 {
                return Err(MetricError::InvalidAlpha(a));
            }
            a
        } else {
            0.0
        };
        if size0 <= 0.0 {
            return Err(MetricError::InvalidSize(size0));
        }
        let source = match kind {
            "point" => {
                let p = Point3::new(
                    ctx.float(&fields, 1)?,
                    ctx.float(&fields, 2)?,
                    ctx.float(&fields, 3)?,
                );
                MetricSource::point(p, size0, d0, d1, alpha)
            }
            _ => {
                let p0 = Point3::new(
                    ctx.float(&fields, 1)?,
                    ctx.float(&fields, 2)?,
                    ctx.float(&fields, 3)?,
                );
                let closed0 = ctx.flag(&fields, 4)?;
                let p1 = Point3::new(
                    ctx.float(&fields, 5)?,
                    ctx.float(&fields, 6)?,
                    ctx.float(&fields, 7)?,
                );
                let closed1 = ctx.flag(&fields, 8)?;
                MetricSource::segment(p0, closed0, p1, closed1, size0, d0, d1, alpha)?
            }
        };
        sources.push(source);
    }
    Ok(sources)
}
