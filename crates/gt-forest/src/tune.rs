//! Out-of-bag step search over `mtry`.
//!
//! Starting from the default `mtry`, the search fits a small forest and walks
//! left (dividing by `step_factor`) and right (multiplying) while each step
//! improves the out-of-bag error by at least the relative `improve` fraction.
//! No cross-validation is involved, which makes it much cheaper than a grid
//! search at the price of a noisier estimate.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gt_types::{Dataset, GtError, GtResult};

use crate::default_mtry;
use crate::forest::{ForestParams, RandomForest};

/// Configuration for [`OobStepSearch::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OobStepSearch {
    /// Trees grown per visited `mtry`.
    pub ntree_try: usize,
    /// Multiplicative step between visited `mtry` values; must exceed 1.
    pub step_factor: f64,
    /// Minimum relative OOB improvement required to keep walking.
    pub improve: f64,
    /// Starting point; defaults to `floor(sqrt(n_features))`.
    pub mtry_start: Option<usize>,
    pub seed: u64,
    /// Tree shape, taken from the surrounding forest settings rather than
    /// the serialized search block.
    #[serde(skip)]
    pub node_size: usize,
    #[serde(skip)]
    pub max_depth: Option<usize>,
}

impl Default for OobStepSearch {
    fn default() -> Self {
        Self {
            ntree_try: 50,
            step_factor: 2.0,
            improve: 0.05,
            mtry_start: None,
            seed: 0,
            node_size: 1,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OobStep {
    pub mtry: usize,
    pub oob_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OobStepResult {
    /// Every visited `mtry`, ascending.
    pub steps: Vec<OobStep>,
    /// Lowest OOB error; ties go to the smaller `mtry`.
    pub best: OobStep,
}

impl OobStepSearch {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ntree_try(mut self, ntree_try: usize) -> Self {
        self.ntree_try = ntree_try;
        self
    }

    pub fn with_step_factor(mut self, step_factor: f64) -> Self {
        self.step_factor = step_factor;
        self
    }

    pub fn with_improve(mut self, improve: f64) -> Self {
        self.improve = improve;
        self
    }

    pub fn with_mtry_start(mut self, mtry: usize) -> Self {
        self.mtry_start = Some(mtry);
        self
    }

    pub fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self, n_features: usize) -> GtResult<()> {
        if !(self.step_factor > 1.0) {
            return Err(GtError::invalid(format!(
                "step_factor must be greater than 1, got {}",
                self.step_factor
            )));
        }
        if self.ntree_try == 0 {
            return Err(GtError::invalid("ntree_try must be at least 1"));
        }
        if !self.improve.is_finite() || self.improve < 0.0 {
            return Err(GtError::invalid(format!(
                "improve must be a non-negative fraction, got {}",
                self.improve
            )));
        }
        if let Some(start) = self.mtry_start {
            if start == 0 || start > n_features {
                return Err(GtError::invalid(format!(
                    "mtry_start must be in 1..={n_features}, got {start}"
                )));
            }
        }
        Ok(())
    }

    pub fn run(&self, dataset: &Dataset) -> GtResult<OobStepResult> {
        let n_features = dataset.n_features();
        self.validate(n_features)?;

        let start = self.mtry_start.unwrap_or_else(|| default_mtry(n_features));
        info!(
            "OOB step search: start mtry={}, ntree_try={}, step_factor={}, improve={}",
            start, self.ntree_try, self.step_factor, self.improve
        );

        let start_error = self.oob_error(dataset, start)?;
        let mut steps = vec![OobStep {
            mtry: start,
            oob_error: start_error,
        }];

        // left
        let mut previous = start_error;
        let mut mtry = start;
        while mtry > 1 {
            mtry = ((mtry as f64 / self.step_factor).floor() as usize).max(1);
            let error = self.oob_error(dataset, mtry)?;
            steps.push(OobStep {
                mtry,
                oob_error: error,
            });
            if !self.improved(previous, error) {
                break;
            }
            previous = error;
        }

        // right
        previous = start_error;
        mtry = start;
        while mtry < n_features {
            mtry = ((mtry as f64 * self.step_factor).ceil() as usize).min(n_features);
            let error = self.oob_error(dataset, mtry)?;
            steps.push(OobStep {
                mtry,
                oob_error: error,
            });
            if !self.improved(previous, error) {
                break;
            }
            previous = error;
        }

        steps.sort_by_key(|s| s.mtry);
        steps.dedup_by_key(|s| s.mtry);

        let mut best = steps[0];
        for step in &steps[1..] {
            if step.oob_error < best.oob_error {
                best = *step;
            }
        }
        info!(
            "OOB step search finished: best mtry={} (oob error {:.4}) after {} steps",
            best.mtry,
            best.oob_error,
            steps.len()
        );

        Ok(OobStepResult { steps, best })
    }

    fn improved(&self, previous: f64, current: f64) -> bool {
        if previous <= 0.0 {
            return false;
        }
        (previous - current) / previous >= self.improve
    }

    fn oob_error(&self, dataset: &Dataset, mtry: usize) -> GtResult<f64> {
        let params = ForestParams::new(mtry, self.ntree_try)
            .with_node_size(self.node_size)
            .with_max_depth(self.max_depth);
        let forest = RandomForest::fit(&params, &dataset.full_view(), self.seed)?;
        let error = forest.oob_error().ok_or_else(|| {
            GtError::evaluation(format!(
                "no out-of-bag rows for mtry={mtry}; increase ntree_try"
            ))
        })?;
        debug!("mtry={} oob_error={:.4}", mtry, error);
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_data::SyntheticSpec;

    fn data() -> Dataset {
        SyntheticSpec {
            rows: 100,
            features: 16,
            informative: 4,
            separation: 1.5,
            seed: 3,
        }
        .generate()
        .unwrap()
    }

    #[test]
    fn visits_start_and_both_directions() {
        let ds = data();
        let result = OobStepSearch::default()
            .with_ntree_try(20)
            .with_improve(0.0)
            .with_seed(1)
            .run(&ds)
            .unwrap();

        let visited: Vec<usize> = result.steps.iter().map(|s| s.mtry).collect();
        assert!(visited.contains(&4));
        assert!(visited.windows(2).all(|w| w[0] < w[1]));
        assert!(visited.iter().all(|&m| (1..=16).contains(&m)));
        assert!(result.steps.contains(&result.best));
        assert!(result
            .steps
            .iter()
            .all(|s| s.oob_error >= result.best.oob_error));
    }

    #[test]
    fn unreachable_improvement_stops_after_one_step_each_way() {
        let ds = data();
        let result = OobStepSearch::default()
            .with_ntree_try(10)
            .with_improve(2.0)
            .with_mtry_start(4)
            .run(&ds)
            .unwrap();
        let visited: Vec<usize> = result.steps.iter().map(|s| s.mtry).collect();
        assert_eq!(visited, vec![2, 4, 8]);
    }

    #[test]
    fn reproducible_for_a_seed() {
        let ds = data();
        let search = OobStepSearch::default().with_ntree_try(10).with_seed(9);
        assert_eq!(search.run(&ds).unwrap(), search.run(&ds).unwrap());
    }

    #[test]
    fn tree_shape_is_not_read_from_json() {
        let search: OobStepSearch =
            serde_json::from_str(r#"{ "ntree_try": 5, "node_size": 9, "max_depth": 2 }"#).unwrap();
        assert_eq!(search.ntree_try, 5);
        assert_eq!(search.node_size, 1);
        assert_eq!(search.max_depth, None);
    }

    #[test]
    fn depth_limit_reaches_the_forest() {
        let ds = data();
        let search = OobStepSearch::default()
            .with_ntree_try(10)
            .with_improve(2.0)
            .with_mtry_start(4)
            .with_seed(2);
        let stumps = search.clone().with_max_depth(Some(1)).run(&ds).unwrap();
        let full = search.run(&ds).unwrap();
        assert_eq!(stumps.steps.len(), full.steps.len());
        assert_ne!(stumps, full);
    }

    #[test]
    fn rejects_bad_step_factor() {
        let ds = data();
        let err = OobStepSearch::default()
            .with_step_factor(1.0)
            .run(&ds)
            .unwrap_err();
        assert!(matches!(err, GtError::InvalidConfiguration { .. }));
    }

    #[test]
    fn rejects_out_of_range_start() {
        let ds = data();
        let err = OobStepSearch::default()
            .with_mtry_start(17)
            .run(&ds)
            .unwrap_err();
        assert!(err.to_string().contains("mtry_start"));
    }
}
