//! Labeled datasets and borrowed row subsets.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::errors::{GtError, GtResult};

/// One labeled example: a numeric feature vector plus a class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub features: Vec<f64>,
    /// Index into [`Dataset::classes`].
    pub label: usize,
}

impl Example {
    pub fn new(features: Vec<f64>, label: usize) -> Self {
        Self { features, label }
    }
}

/// An ordered, immutable collection of labeled examples.
///
/// All examples share the same dimensionality and every label points into a
/// class list that is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    classes: Vec<String>,
    examples: Vec<Example>,
}

impl Dataset {
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<String>,
        examples: Vec<Example>,
    ) -> GtResult<Self> {
        if feature_names.is_empty() {
            return Err(GtError::invalid("dataset must have at least one feature"));
        }
        if classes.is_empty() {
            return Err(GtError::invalid("dataset must declare at least one class"));
        }

        let width = feature_names.len();
        for (row, example) in examples.iter().enumerate() {
            if example.features.len() != width {
                return Err(GtError::invalid(format!(
                    "row {row} has {} features, expected {width}",
                    example.features.len()
                )));
            }
            if example.label >= classes.len() {
                return Err(GtError::invalid(format!(
                    "row {row} has label index {} but only {} classes are declared",
                    example.label,
                    classes.len()
                )));
            }
        }

        Ok(Self {
            feature_names,
            classes,
            examples,
        })
    }

    /// Build a dataset with generated feature names (`V1`, `V2`, ...).
    pub fn from_examples(classes: Vec<String>, examples: Vec<Example>) -> GtResult<Self> {
        let width = examples.first().map(|e| e.features.len()).unwrap_or(0);
        let feature_names = (1..=width).map(|i| format!("V{i}")).collect();
        Self::new(feature_names, classes, examples)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn example(&self, row: usize) -> &Example {
        &self.examples[row]
    }

    /// Number of examples per class, indexed by class.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for example in &self.examples {
            counts[example.label] += 1;
        }
        counts
    }

    /// Borrow a subset of rows. Row indices must be in bounds.
    pub fn view(&self, rows: Vec<usize>) -> DatasetView<'_> {
        debug_assert!(rows.iter().all(|&r| r < self.examples.len()));
        DatasetView { data: self, rows }
    }

    /// Borrow every row.
    pub fn full_view(&self) -> DatasetView<'_> {
        self.view((0..self.examples.len()).collect())
    }
}

/// A borrowed subset of a [`Dataset`], e.g. the training folds of one split.
#[derive(Debug, Clone)]
pub struct DatasetView<'a> {
    data: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> DatasetView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.data.n_features()
    }

    pub fn n_classes(&self) -> usize {
        self.data.n_classes()
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.data
    }

    /// Rows of the parent dataset covered by this view.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// The `i`-th example of the view (not the `i`-th row of the dataset).
    pub fn get(&self, i: usize) -> &'a Example {
        self.data.example(self.rows[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Example> + '_ {
        self.rows.iter().map(move |&r| self.data.example(r))
    }

    /// Feature matrix, one row per example of the view.
    pub fn records(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), self.n_features()), |(i, j)| {
            self.get(i).features[j]
        })
    }

    pub fn targets(&self) -> Array1<usize> {
        self.iter().map(|e| e.label).collect()
    }

    /// Copy the view into a `linfa` dataset for fitting and scoring.
    pub fn to_linfa(&self) -> linfa::Dataset<f64, usize, ndarray::Ix1> {
        linfa::Dataset::new(self.records(), self.targets())
    }
}
