//! Classification metrics for held-out predictions.

use linfa::prelude::*;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{GtError, GtResult};

/// Score used to compare candidates. Higher is better for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Accuracy,
    /// Cohen's kappa: accuracy corrected for chance agreement.
    Kappa,
}

impl Metric {
    /// Score `predicted` against the targets of `truth`.
    pub fn score(
        &self,
        predicted: &Array1<usize>,
        truth: &linfa::Dataset<f64, usize, ndarray::Ix1>,
    ) -> GtResult<f64> {
        if predicted.len() != truth.targets.len() {
            return Err(GtError::evaluation(format!(
                "{} predictions for {} held-out rows",
                predicted.len(),
                truth.targets.len()
            )));
        }
        if predicted.is_empty() {
            return Err(GtError::evaluation("cannot score an empty held-out set"));
        }
        match self {
            Self::Accuracy => {
                let cm = predicted.confusion_matrix(truth).map_err(|e| {
                    GtError::evaluation(format!("failed to build confusion matrix: {e}"))
                })?;
                Ok(f64::from(cm.accuracy()))
            }
            Self::Kappa => Ok(cohen_kappa(predicted.view(), truth.targets.view())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accuracy => f.write_str("Accuracy"),
            Self::Kappa => f.write_str("Kappa"),
        }
    }
}

/// Not offered by linfa's `ConfusionMatrix`, so computed from the marginals.
fn cohen_kappa(predicted: ArrayView1<'_, usize>, actual: ArrayView1<'_, usize>) -> f64 {
    let n_classes = predicted
        .iter()
        .chain(actual.iter())
        .max()
        .map_or(0, |&m| m + 1);
    let mut actual_counts = vec![0usize; n_classes];
    let mut predicted_counts = vec![0usize; n_classes];
    let mut agree = 0usize;
    for (&p, &a) in predicted.iter().zip(actual.iter()) {
        actual_counts[a] += 1;
        predicted_counts[p] += 1;
        if p == a {
            agree += 1;
        }
    }

    let n = actual.len() as f64;
    let observed = agree as f64 / n;
    let expected: f64 = actual_counts
        .iter()
        .zip(&predicted_counts)
        .map(|(&a, &p)| (a as f64 / n) * (p as f64 / n))
        .sum();
    if (1.0 - expected).abs() < f64::EPSILON {
        // Single-class fold: agreement cannot exceed chance.
        return if observed >= 1.0 { 1.0 } else { 0.0 };
    }
    (observed - expected) / (1.0 - expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn truth(actual: Vec<usize>) -> linfa::Dataset<f64, usize, ndarray::Ix1> {
        linfa::Dataset::new(Array2::<f64>::zeros((actual.len(), 1)), Array1::from(actual))
    }

    fn split(pairs: &[(usize, usize)]) -> (Array1<usize>, linfa::Dataset<f64, usize, ndarray::Ix1>) {
        let actual = pairs.iter().map(|&(a, _)| a).collect();
        let predicted = pairs.iter().map(|&(_, p)| p).collect();
        (predicted, truth(actual))
    }

    #[test]
    fn accuracy_counts_agreement() {
        let (predicted, truth) = split(&[(0, 0), (0, 1), (1, 1), (1, 1)]);
        let score = Metric::Accuracy.score(&predicted, &truth).unwrap();
        assert!((score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn kappa_matches_hand_computation() {
        // 20 rows: actual 0 → (8 correct, 2 wrong), actual 1 → (3 wrong, 7 correct)
        let mut pairs = vec![(0, 0); 8];
        pairs.extend(vec![(0, 1); 2]);
        pairs.extend(vec![(1, 0); 3]);
        pairs.extend(vec![(1, 1); 7]);
        let (predicted, truth) = split(&pairs);
        // po = 0.75, pe = 0.5*0.55 + 0.5*0.45 = 0.5
        let score = Metric::Kappa.score(&predicted, &truth).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn kappa_on_single_class_fold() {
        let (predicted, truth) = split(&[(1, 1), (1, 1), (1, 1)]);
        assert_eq!(Metric::Kappa.score(&predicted, &truth).unwrap(), 1.0);
        let (predicted, truth) = split(&[(1, 0), (1, 1), (1, 1)]);
        assert_eq!(Metric::Kappa.score(&predicted, &truth).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_evaluation_failure() {
        let err = Metric::Accuracy
            .score(&Array1::from(vec![0, 1]), &truth(vec![0, 1, 1]))
            .unwrap_err();
        assert!(matches!(err, GtError::EvaluationFailure { .. }));

        let err = Metric::Kappa
            .score(&Array1::from(Vec::<usize>::new()), &truth(vec![]))
            .unwrap_err();
        assert!(matches!(err, GtError::EvaluationFailure { .. }));
    }

    #[test]
    fn metric_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Metric::Kappa).unwrap(), "\"kappa\"");
        assert_eq!(Metric::default(), Metric::Accuracy);
    }
}
