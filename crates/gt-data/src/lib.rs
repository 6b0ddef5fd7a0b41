//! Dataset ingestion for GroveTune.
//!
//! [`CsvLoader`] reads labeled tables from disk; [`synthetic`] generates
//! reproducible two-class data for experiments and tests.

pub mod loaders;
pub mod synthetic;

pub use loaders::CsvLoader;
pub use synthetic::SyntheticSpec;
