//! Subcommand modules for the `qvcal` binary.

pub mod build;
pub mod stats;
