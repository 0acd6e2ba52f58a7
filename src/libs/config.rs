use crate::libs::error::{CalibrationError, Result};

/// Parameter counts a calibration table can be built for.
pub const SUPPORTED_PARAMETER_COUNTS: [usize; 2] = [4, 6];

/// A cut must hold at least this many incorrect calls to be emitted.
pub const MIN_INCORRECT_COUNT: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn level(&self) -> tracing::Level {
        match self {
            Verbosity::Quiet => tracing::Level::ERROR,
            Verbosity::Normal => tracing::Level::INFO,
            Verbosity::Verbose => tracing::Level::DEBUG,
        }
    }
}

/// Settings threaded through the thresholder and the table builder.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Requested number of thresholds, one per parameter
    pub requested: Vec<usize>,
    /// Collapse runs of equal thresholds
    pub compress: bool,
    /// Significance floor for an emitted cut
    pub min_incorrect: u64,
    /// Threads used to score hyperslabs
    pub parallel: usize,
    /// Initial capacity of the record buffer
    pub room: usize,
    pub verbosity: Verbosity,
}

impl CalibrationConfig {
    pub fn new(requested: &[usize]) -> Self {
        CalibrationConfig {
            requested: requested.to_vec(),
            compress: true,
            min_incorrect: MIN_INCORRECT_COUNT,
            parallel: 1,
            room: 100_000,
            verbosity: Verbosity::Normal,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.requested.len()
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_PARAMETER_COUNTS.contains(&self.requested.len()) {
            return Err(CalibrationError::ParameterCount(self.requested.len()));
        }
        if let Some(dimension) = self.requested.iter().position(|&n| n == 0) {
            return Err(CalibrationError::ZeroThresholds { dimension });
        }
        Ok(())
    }
}

/// Send log records to stderr; stdout carries the table.
pub fn init_logging(verbosity: Verbosity) {
    // A subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_max_level(verbosity.level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}
