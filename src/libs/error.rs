use thiserror::Error;

/// Errors raised while ingesting training data or building a calibration table.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// A training line could not be parsed
    #[error("Malformed training line {line}: {message}")]
    MalformedLine {
        /// The line number (1-based)
        line: usize,
        /// A human-readable message explaining the error
        message: String,
    },

    #[error("Unsupported parameter count {0}; expected 4 or 6")]
    ParameterCount(usize),

    #[error("Threshold count for parameter {dimension} must be at least 1")]
    ZeroThresholds { dimension: usize },

    #[error("No training bases to calibrate")]
    EmptyTrainingSet,

    /// A value falls beyond the last threshold of its dimension.
    /// Thresholds are derived from the same data, so this points to a bug upstream.
    #[error("Parameter {dimension} value {value} exceeds the maximum threshold {max}")]
    ValueAboveThreshold {
        dimension: usize,
        value: f64,
        max: f64,
    },

    #[error("Cannot allocate {what} of {cells} cells ({bytes} bytes)")]
    Allocation {
        what: &'static str,
        cells: usize,
        bytes: usize,
    },

    #[error("Grid size overflows: the product of threshold counts is too large")]
    GridOverflow,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CalibrationError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedLine {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Allocate `cells` default values, reporting the requested size on failure.
pub fn try_alloc<T: Clone + Default>(what: &'static str, cells: usize) -> Result<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(cells)
        .map_err(|_| CalibrationError::Allocation {
            what,
            cells,
            bytes: cells.saturating_mul(std::mem::size_of::<T>()),
        })?;
    v.resize(cells, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_alloc() {
        let v: Vec<u64> = try_alloc("bins", 16).unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&x| x == 0));

        let res: Result<Vec<u64>> = try_alloc("bins", usize::MAX / 2);
        match res {
            Err(CalibrationError::Allocation { what, cells, .. }) => {
                assert_eq!(what, "bins");
                assert_eq!(cells, usize::MAX / 2);
            }
            _ => panic!("expected an allocation error"),
        }
    }

    #[test]
    fn test_display() {
        let err = CalibrationError::malformed(12, "missing is_match");
        assert_eq!(
            err.to_string(),
            "Malformed training line 12: missing is_match"
        );
        assert!(CalibrationError::ParameterCount(5)
            .to_string()
            .contains("expected 4 or 6"));
    }
}
