//! Summary statistics and candidate ranking for a finished search.

use serde::{Deserialize, Serialize};
use std::fmt;

use gt_types::{Metric, ParameterConfiguration};

use crate::trial::SearchTrace;

/// Descriptive statistics of one score sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for fewer than two
    /// scores.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreSummary {
    /// Summary of `scores`. An empty slice yields NaN statistics.
    pub fn from_scores(scores: &[f64]) -> Self {
        let count = scores.len();
        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let mean = scores.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let ss: f64 = scores.iter().map(|s| (s - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count,
            mean,
            std_dev,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// 1 for the best candidate.
    pub rank: usize,
    pub candidate_index: usize,
    pub configuration: ParameterConfiguration,
    pub summary: ScoreSummary,
}

/// Candidates of a search ranked by mean score, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub metric: Metric,
    pub strategy: String,
    pub rows: Vec<ReportRow>,
}

impl SearchReport {
    pub fn from_trace(trace: &SearchTrace) -> Self {
        let mut rows: Vec<ReportRow> = trace
            .results
            .iter()
            .map(|r| ReportRow {
                rank: 0,
                candidate_index: r.candidate_index,
                configuration: r.configuration.clone(),
                summary: r.summary(),
            })
            .collect();

        // Stable sort keeps generation order among equal means.
        rows.sort_by(|a, b| b.summary.mean.total_cmp(&a.summary.mean));
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }

        Self {
            metric: trace.metric,
            strategy: trace.strategy.clone(),
            rows,
        }
    }

    pub fn best(&self) -> Option<&ReportRow> {
        self.rows.first()
    }

    pub fn top(&self, n: usize) -> &[ReportRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.configuration.to_string().len())
            .max()
            .unwrap_or(0)
            .max("configuration".len());

        writeln!(
            f,
            "{} search, {} candidates, ranked by mean {}",
            self.strategy,
            self.rows.len(),
            self.metric
        )?;
        writeln!(
            f,
            "{:>4}  {:<width$}  {:>8}  {:>8}  {:>8}  {:>8}",
            "rank", "configuration", "mean", "sd", "min", "max"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>4}  {:<width$}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}",
                row.rank,
                row.configuration.to_string(),
                row.summary.mean,
                row.summary.std_dev,
                row.summary.min,
                row.summary.max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resampling::ResamplingPlan;
    use crate::trial::EvaluationResult;

    fn trace(means: &[&[f64]]) -> SearchTrace {
        let mut trace = SearchTrace::new("grid", "test", Metric::Accuracy, ResamplingPlan::default());
        for (i, scores) in means.iter().enumerate() {
            trace.push(EvaluationResult {
                candidate_index: i,
                configuration: ParameterConfiguration::new().with("mtry", i as i64 + 1),
                scores: scores.to_vec(),
                duration_ms: 0,
            });
        }
        trace
    }

    #[test]
    fn summary_statistics() {
        let s = ScoreSummary::from_scores(&[0.75, 0.85, 0.80, 0.90]);
        assert_eq!(s.count, 4);
        assert!((s.mean - 0.825).abs() < 1e-12);
        assert!((s.std_dev - 0.064_549_722_436_790_3).abs() < 1e-9);
        assert_eq!(s.min, 0.75);
        assert_eq!(s.max, 0.90);
    }

    #[test]
    fn single_score_has_zero_spread() {
        let s = ScoreSummary::from_scores(&[0.5]);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.min, s.max);
    }

    #[test]
    fn empty_scores_are_nan() {
        let s = ScoreSummary::from_scores(&[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan());
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let report = SearchReport::from_trace(&trace(&[
            &[0.70, 0.72],
            &[0.85, 0.83],
            &[0.83, 0.85],
            &[0.90, 0.92],
        ]));
        let order: Vec<usize> = report.rows.iter().map(|r| r.candidate_index).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
        let ranks: Vec<usize> = report.rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(report.best().unwrap().candidate_index, 3);
        assert_eq!(report.top(2).len(), 2);
        assert_eq!(report.top(10).len(), 4);
    }

    #[test]
    fn display_renders_table() {
        let report = SearchReport::from_trace(&trace(&[&[0.5, 0.6], &[0.9, 0.8]]));
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("grid search, 2 candidates"));
        assert!(lines[1].contains("configuration"));
        assert!(lines[2].trim_start().starts_with("1  mtry=2"));
        assert!(lines[2].contains("0.8500"));
    }
}
