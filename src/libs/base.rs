use crate::libs::error::{CalibrationError, Result};
use std::io::BufRead;
use tracing::warn;

/// One labelled base call from a training alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub is_match: bool,
    pub parameters: Vec<f64>,
}

/// What a single training line carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Base(Base),
    /// `schar == '-'`: a base missing from the sample, without trace parameters
    Deletion { consensus_pos: u64 },
}

/// Returns true for lines starting with `#`, `;` or `/*`.
pub fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('#') || line.starts_with(';') || line.starts_with("/*")
}

fn parse_char(token: Option<&str>, field: &str, line_no: usize) -> Result<char> {
    let token = token.ok_or_else(|| CalibrationError::malformed(line_no, format!("missing {}", field)))?;
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CalibrationError::malformed(
            line_no,
            format!("{} '{}' is not a single character", field, token),
        )),
    }
}

fn parse_u64(token: Option<&str>, field: &str, line_no: usize) -> Result<u64> {
    let token = token.ok_or_else(|| CalibrationError::malformed(line_no, format!("missing {}", field)))?;
    token.parse::<u64>().map_err(|_| {
        CalibrationError::malformed(line_no, format!("{} '{}' is not an integer", field, token))
    })
}

/// Parse one training line.
///
/// `consensus_pos consensus_char is_match sample_pos sample_char p1 .. pN`
///
/// Blank and comment lines yield `Ok(None)`. Tokens after the N-th parameter are ignored.
///
/// ```
/// use qvcal::libs::base::{parse_line, Record};
/// match parse_line("17 A 1 15 A 0.8 1.2 0.9 1.5", 4, 1).unwrap() {
///     Some(Record::Base(base)) => {
///         assert!(base.is_match);
///         assert_eq!(base.parameters, vec![0.8, 1.2, 0.9, 1.5]);
///     }
///     _ => unreachable!(),
/// }
/// assert!(parse_line("# header", 4, 2).unwrap().is_none());
/// ```
pub fn parse_line(line: &str, parameter_count: usize, line_no: usize) -> Result<Option<Record>> {
    if line.trim().is_empty() || is_comment(line) {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let consensus_pos = parse_u64(fields.next(), "consensus_pos", line_no)?;
    parse_char(fields.next(), "consensus_char", line_no)?;
    let is_match = parse_u64(fields.next(), "is_match", line_no)? != 0;
    parse_u64(fields.next(), "sample_pos", line_no)?;
    let sample_char = parse_char(fields.next(), "sample_char", line_no)?;

    if sample_char == '-' {
        return Ok(Some(Record::Deletion { consensus_pos }));
    }

    let mut parameters = Vec::with_capacity(parameter_count);
    for i in 0..parameter_count {
        let token = fields.next().ok_or_else(|| {
            CalibrationError::malformed(
                line_no,
                format!("expected {} parameters, found {}", parameter_count, i),
            )
        })?;
        let value = token.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
            CalibrationError::malformed(
                line_no,
                format!("parameter {} '{}' is not a finite number", i + 1, token),
            )
        })?;
        parameters.push(value);
    }

    Ok(Some(Record::Base(Base {
        is_match,
        parameters,
    })))
}

/// Counters collected while reading training data.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: usize,
    pub comments: usize,
    pub deletions: usize,
    pub skipped: usize,
    pub bases: usize,
    pub matches: usize,
}

impl IngestStats {
    pub fn mismatches(&self) -> usize {
        self.bases - self.matches
    }
}

/// Training bases stored row-major: `values[i * parameter_count + d]`.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    parameter_count: usize,
    is_match: Vec<bool>,
    values: Vec<f64>,
}

impl TrainingSet {
    pub fn new(parameter_count: usize) -> Self {
        Self::with_capacity(parameter_count, 0)
    }

    pub fn with_capacity(parameter_count: usize, room: usize) -> Self {
        TrainingSet {
            parameter_count,
            is_match: Vec::with_capacity(room),
            values: Vec::with_capacity(room.saturating_mul(parameter_count)),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn len(&self) -> usize {
        self.is_match.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_match.is_empty()
    }

    pub fn push(&mut self, base: &Base) {
        assert_eq!(base.parameters.len(), self.parameter_count);
        self.is_match.push(base.is_match);
        self.values.extend_from_slice(&base.parameters);
    }

    /// Iterate `(is_match, parameters)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (bool, &[f64])> + '_ {
        self.is_match
            .iter()
            .copied()
            .zip(self.values.chunks_exact(self.parameter_count.max(1)))
    }

    /// All values of one parameter, in record order.
    pub fn column(&self, dimension: usize) -> Vec<f64> {
        self.values
            .iter()
            .skip(dimension)
            .step_by(self.parameter_count)
            .copied()
            .collect()
    }
}

/// Read training records, skipping malformed lines with a warning.
pub fn read_training<R: BufRead>(
    reader: R,
    parameter_count: usize,
    room: usize,
) -> Result<(TrainingSet, IngestStats)> {
    let mut set = TrainingSet::with_capacity(parameter_count, room);
    let mut stats = IngestStats::default();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        stats.lines += 1;

        match parse_line(&line, parameter_count, i + 1) {
            Ok(Some(Record::Base(base))) => {
                stats.bases += 1;
                if base.is_match {
                    stats.matches += 1;
                }
                set.push(&base);
            }
            Ok(Some(Record::Deletion { .. })) => stats.deletions += 1,
            Ok(None) => {
                if is_comment(&line) {
                    stats.comments += 1;
                }
            }
            Err(err) => {
                warn!("{}; skipped", err);
                stats.skipped += 1;
            }
        }
    }

    Ok((set, stats))
}
