use crate::libs::base::TrainingSet;
use crate::libs::builder::{CalibrationTable, TableBuilder};
use crate::libs::config::CalibrationConfig;
use crate::libs::error::{CalibrationError, Result};
use crate::libs::grid::{populate, BinGrid};
use crate::libs::threshold::build_parameters;
use itertools::Itertools;
use tracing::info;

/// Threshold, bin and build a lookup table from a training set.
pub fn calibrate(set: &TrainingSet, config: &CalibrationConfig) -> Result<CalibrationTable> {
    config.validate()?;
    if set.parameter_count() != config.parameter_count() {
        return Err(CalibrationError::ParameterCount(set.parameter_count()));
    }

    let parameters = build_parameters(set, &config.requested, config.compress)?;
    info!(
        "Thresholds established: {} (requested {})",
        parameters.iter().map(|p| p.threshold_count()).join(" "),
        config.requested.iter().join(" ")
    );

    let mut grid = BinGrid::from_parameters(&parameters)?;
    info!("Bin grid: {} cells", grid.len());

    let added = populate(&mut grid, &parameters, set)?;
    debug_assert_eq!(added, grid.total());

    let table = TableBuilder::new(&parameters, config).build(&mut grid)?;
    info!(
        "Emitted {} entries in {} passes; {} of {} bases unaccounted",
        table.entries.len(),
        table.passes,
        table.unaccounted,
        table.total_bases
    );

    Ok(table)
}
