pub mod base;
pub mod builder;
pub mod config;
pub mod cut;
pub mod error;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod table;
pub mod threshold;

pub use error::{CalibrationError, Result};
pub use pipeline::calibrate;
