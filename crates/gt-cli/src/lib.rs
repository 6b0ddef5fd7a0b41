//! Configuration-driven tuning runs for GroveTune.
//!
//! Backs the `gt-tune` binary: a [`TuningConfig`] names a dataset and either
//! a cross-validated search or an out-of-bag step search, and [`execute`]
//! carries it out with the random forest trainer.

pub mod config;
pub mod run;

pub use config::{DatasetSource, ForestDefaults, TuningConfig};
pub use run::{execute, RunSummary};
