//! # gt-forest
//!
//! Random forest classifier for GroveTune.
//!
//! Bags `linfa-trees` Gini decision trees over seeded bootstrap samples,
//! each tree restricted to `mtry` randomly drawn feature columns, and keeps
//! the out-of-bag votes for an error estimate. [`RandomForestTrainer`] plugs
//! the forest into the [`Trainer`] seam; [`OobStepSearch`] tunes `mtry` from
//! the out-of-bag error alone.
//!
//! [`Trainer`]: gt_types::Trainer

mod forest;
mod trainer;
mod tune;

pub use forest::{ForestParams, RandomForest};
pub use trainer::RandomForestTrainer;
pub use tune::{OobStep, OobStepResult, OobStepSearch};

/// Default number of features per tree for classification:
/// `floor(sqrt(n_features))`, never below 1.
pub fn default_mtry(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).max(1)
}
