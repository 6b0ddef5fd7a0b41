//! The seam between the tuning harness and a learning algorithm.

use ndarray::{Array1, ArrayView2};

use crate::dataset::{Dataset, DatasetView};
use crate::errors::GtResult;
use crate::metrics::Metric;
use crate::params::ParameterConfiguration;

/// A fitted model that assigns class indices to feature rows.
pub trait Classifier {
    /// One predicted class index per row of `records`.
    fn predict(&self, records: ArrayView2<'_, f64>) -> Array1<usize>;

    /// Score this model's predictions on `held_out`.
    fn score(&self, held_out: &DatasetView<'_>, metric: Metric) -> GtResult<f64> {
        let truth = held_out.to_linfa();
        let predicted = self.predict(truth.records.view());
        metric.score(&predicted, &truth)
    }

    fn accuracy(&self, held_out: &DatasetView<'_>) -> GtResult<f64> {
        self.score(held_out, Metric::Accuracy)
    }
}

/// Turns a parameter configuration plus training rows into a fitted model.
pub trait Trainer: Send + Sync {
    type Model: Classifier;

    /// Reject configurations the algorithm cannot train with, before any
    /// fitting happens.
    fn validate(&self, config: &ParameterConfiguration, dataset: &Dataset) -> GtResult<()>;

    /// Fit a model. All randomness must derive from `seed`.
    fn fit(
        &self,
        config: &ParameterConfiguration,
        train: &DatasetView<'_>,
        seed: u64,
    ) -> GtResult<Self::Model>;

    /// Short algorithm name used in logs and reports.
    fn name(&self) -> &str;
}
