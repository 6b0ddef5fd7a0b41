//! Per-candidate results and the search trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gt_types::{Metric, ParameterConfiguration};

use crate::report::ScoreSummary;
use crate::resampling::ResamplingPlan;

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Scores one candidate configuration produced under the resampling plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Position of the candidate in generation order (0-indexed).
    pub candidate_index: usize,
    pub configuration: ParameterConfiguration,
    /// One score per (repeat, fold), repeat-major.
    pub scores: Vec<f64>,
    pub duration_ms: u64,
}

impl EvaluationResult {
    pub fn mean(&self) -> f64 {
        ScoreSummary::from_scores(&self.scores).mean
    }

    pub fn std_dev(&self) -> f64 {
        ScoreSummary::from_scores(&self.scores).std_dev
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary::from_scores(&self.scores)
    }
}

/// Index of the result with the highest mean score. Ties keep the earliest
/// result; `None` for an empty slice.
pub fn select_best(results: &[EvaluationResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, result) in results.iter().enumerate() {
        let mean = result.mean();
        match best {
            Some((_, best_mean)) if !(mean > best_mean) => {}
            _ => best = Some((i, mean)),
        }
    }
    best.map(|(i, _)| i)
}

/// Ordered record of every candidate evaluated in one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTrace {
    pub id: SearchId,
    /// Candidate generation policy, e.g. "grid".
    pub strategy: String,
    /// Trainer name, e.g. "random_forest".
    pub trainer: String,
    pub metric: Metric,
    pub plan: ResamplingPlan,
    pub results: Vec<EvaluationResult>,
    pub best_index: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SearchTrace {
    pub fn new(strategy: &str, trainer: &str, metric: Metric, plan: ResamplingPlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy: strategy.to_string(),
            trainer: trainer.to_string(),
            metric,
            plan,
            results: Vec::new(),
            best_index: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a result and reselect the best index with [`select_best`].
    pub fn push(&mut self, result: EvaluationResult) {
        self.results.push(result);
        self.best_index = select_best(&self.results);
    }

    pub fn best(&self) -> Option<&EvaluationResult> {
        self.best_index.map(|i| &self.results[i])
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, scores: &[f64]) -> EvaluationResult {
        EvaluationResult {
            candidate_index: index,
            configuration: ParameterConfiguration::new().with("mtry", index as i64 + 1),
            scores: scores.to_vec(),
            duration_ms: 1,
        }
    }

    #[test]
    fn select_best_is_strictly_maximal() {
        let results = vec![
            result(0, &[0.80, 0.82]),
            result(1, &[0.90, 0.84]),
            result(2, &[0.70, 0.71]),
        ];
        assert_eq!(select_best(&results), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn select_best_ties_go_to_earliest() {
        let results = vec![
            result(0, &[0.5, 0.6]),
            result(1, &[0.9, 0.8]),
            result(2, &[0.8, 0.9]),
        ];
        assert_eq!(select_best(&results), Some(1));
    }

    #[test]
    fn trace_tracks_best_incrementally() {
        let mut trace = SearchTrace::new("grid", "majority", Metric::Accuracy, ResamplingPlan::default());
        assert!(trace.best().is_none());

        trace.push(result(0, &[0.80]));
        assert_eq!(trace.best_index, Some(0));
        trace.push(result(1, &[0.85]));
        assert_eq!(trace.best_index, Some(1));
        trace.push(result(2, &[0.85]));
        assert_eq!(trace.best_index, Some(1));
        trace.push(result(3, &[0.10]));
        assert_eq!(trace.best_index, Some(1));

        assert_eq!(trace.len(), 4);
        assert_eq!(trace.best_index, select_best(&trace.results));
    }

    #[test]
    fn pushed_trace_keeps_earliest_of_tied_means() {
        let cases: [(&[f64], usize); 3] = [
            (&[0.7, 0.7, 0.7], 0),
            (&[0.2, 0.9, 0.4, 0.9], 1),
            (&[0.5, 0.6, 0.6, 0.61], 3),
        ];
        for (means, expected) in cases {
            let mut trace =
                SearchTrace::new("manual", "majority", Metric::Accuracy, ResamplingPlan::default());
            for (i, &m) in means.iter().enumerate() {
                trace.push(result(i, &[m]));
            }
            assert_eq!(trace.best_index, Some(expected), "{means:?}");
            assert_eq!(trace.best_index, select_best(&trace.results));
        }
    }

    #[test]
    fn trace_serializes_to_json() {
        let mut trace = SearchTrace::new("manual", "majority", Metric::Kappa, ResamplingPlan::new(5, 1, 3));
        trace.push(result(0, &[0.5, 0.7]));
        trace.mark_finished();

        let json = trace.to_json().unwrap();
        let back: SearchTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
        assert!(json.contains("\"kappa\""));
    }

    #[test]
    fn result_statistics() {
        let r = result(0, &[0.8, 0.9, 1.0]);
        assert!((r.mean() - 0.9).abs() < 1e-12);
        assert!((r.std_dev() - 0.1).abs() < 1e-12);
    }
}
