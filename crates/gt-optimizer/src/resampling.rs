//! Repeated k-fold cross-validation.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gt_types::{
    derive_seed, Classifier, Dataset, GtError, GtResult, Metric, ParameterConfiguration, Trainer,
};

fn default_stratified() -> bool {
    true
}

/// Repeated k-fold cross-validation protocol.
///
/// The same plan applied to the same dataset always yields the same fold
/// assignment, whatever configuration is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResamplingPlan {
    pub folds: usize,
    pub repeats: usize,
    pub seed: u64,
    /// Preserve class proportions in every fold.
    #[serde(default = "default_stratified")]
    pub stratified: bool,
}

impl Default for ResamplingPlan {
    fn default() -> Self {
        Self::new(10, 3, 7)
    }
}

impl ResamplingPlan {
    pub fn new(folds: usize, repeats: usize, seed: u64) -> Self {
        Self {
            folds,
            repeats,
            seed,
            stratified: true,
        }
    }

    pub fn with_stratified(mut self, stratified: bool) -> Self {
        self.stratified = stratified;
        self
    }

    /// Number of scores one evaluation produces.
    pub fn score_count(&self) -> usize {
        self.folds * self.repeats
    }

    pub fn validate(&self) -> GtResult<()> {
        if self.folds < 2 {
            return Err(GtError::invalid(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        if self.repeats < 1 {
            return Err(GtError::invalid("cross-validation needs at least 1 repeat"));
        }
        Ok(())
    }

    /// Assign every row of `dataset` to one held-out fold per repeat.
    ///
    /// Repeat `r` shuffles with a generator seeded by `seed + r`.
    pub fn partitions(&self, dataset: &Dataset) -> GtResult<Partitions> {
        self.validate()?;

        let mut repeats = Vec::with_capacity(self.repeats);
        for r in 0..self.repeats {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(r as u64));
            let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.folds];

            let groups: Vec<Vec<usize>> = if self.stratified {
                let mut by_class = vec![Vec::new(); dataset.n_classes()];
                for (row, example) in dataset.examples().iter().enumerate() {
                    by_class[example.label].push(row);
                }
                by_class
            } else {
                vec![(0..dataset.len()).collect()]
            };

            // Dealing continues across classes so fold sizes differ by at most one.
            let mut next = 0usize;
            for mut group in groups {
                group.shuffle(&mut rng);
                for row in group {
                    folds[next % self.folds].push(row);
                    next += 1;
                }
            }

            for (f, fold) in folds.iter_mut().enumerate() {
                if fold.is_empty() {
                    return Err(GtError::evaluation(format!(
                        "fold {} of repeat {} is empty: {} rows cannot fill {} folds",
                        f + 1,
                        r + 1,
                        dataset.len(),
                        self.folds
                    )));
                }
                fold.sort_unstable();
            }
            repeats.push(folds);
        }

        Ok(Partitions {
            n_rows: dataset.len(),
            repeats,
        })
    }
}

/// Held-out row sets for every (repeat, fold) pair. Rows within a fold are
/// sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitions {
    n_rows: usize,
    repeats: Vec<Vec<Vec<usize>>>,
}

impl Partitions {
    pub fn repeats(&self) -> usize {
        self.repeats.len()
    }

    pub fn folds(&self) -> usize {
        self.repeats.first().map_or(0, Vec::len)
    }

    pub fn held_out(&self, repeat: usize, fold: usize) -> &[usize] {
        &self.repeats[repeat][fold]
    }

    /// Every row outside the held-out fold, ascending.
    pub fn training_rows(&self, repeat: usize, fold: usize) -> Vec<usize> {
        let held_out = self.held_out(repeat, fold);
        let mut rows = Vec::with_capacity(self.n_rows - held_out.len());
        let mut skip = held_out.iter().peekable();
        for row in 0..self.n_rows {
            if skip.peek() == Some(&&row) {
                skip.next();
                continue;
            }
            rows.push(row);
        }
        rows
    }
}

/// Scores one configuration with repeated cross-validation.
///
/// Built once per search so that all candidates share the same partitions.
#[derive(Debug, Clone)]
pub struct ResamplingEvaluator<'a> {
    dataset: &'a Dataset,
    plan: ResamplingPlan,
    partitions: Partitions,
    metric: Metric,
}

impl<'a> ResamplingEvaluator<'a> {
    pub fn new(dataset: &'a Dataset, plan: ResamplingPlan) -> GtResult<Self> {
        let partitions = plan.partitions(dataset)?;
        Ok(Self {
            dataset,
            plan,
            partitions,
            metric: Metric::default(),
        })
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn plan(&self) -> &ResamplingPlan {
        &self.plan
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    /// Train on every fold complement and score the held-out fold.
    ///
    /// Scores are repeat-major: all folds of repeat 0, then repeat 1, ...
    /// The model seed for each fit derives from the plan seed, the candidate
    /// index, the repeat and the fold.
    pub fn evaluate<T: Trainer + ?Sized>(
        &self,
        trainer: &T,
        config: &ParameterConfiguration,
        candidate_index: usize,
    ) -> GtResult<Vec<f64>> {
        let mut scores = Vec::with_capacity(self.plan.score_count());
        for repeat in 0..self.partitions.repeats() {
            for fold in 0..self.partitions.folds() {
                let train = self.dataset.view(self.partitions.training_rows(repeat, fold));
                let held_out = self
                    .dataset
                    .view(self.partitions.held_out(repeat, fold).to_vec());
                let seed = derive_seed(
                    self.plan.seed,
                    &[candidate_index as u64, repeat as u64, fold as u64],
                );

                let model = trainer.fit(config, &train, seed).map_err(|e| {
                    fold_failure(e, candidate_index, config, repeat, fold)
                })?;
                let score = model
                    .score(&held_out, self.metric)
                    .map_err(|e| fold_failure(e, candidate_index, config, repeat, fold))?;
                if !score.is_finite() {
                    return Err(GtError::evaluation(format!(
                        "candidate {candidate_index} ({config}) produced a non-finite score on repeat {} fold {}",
                        repeat + 1,
                        fold + 1
                    )));
                }
                debug!(
                    "candidate {} ({}) repeat {} fold {}: {}={:.4}",
                    candidate_index,
                    config,
                    repeat + 1,
                    fold + 1,
                    self.metric,
                    score
                );
                scores.push(score);
            }
        }
        Ok(scores)
    }
}

fn fold_failure(
    error: GtError,
    candidate_index: usize,
    config: &ParameterConfiguration,
    repeat: usize,
    fold: usize,
) -> GtError {
    let message = match error {
        GtError::InvalidConfiguration { .. } => return error,
        GtError::EvaluationFailure { message } => message,
        other => other.to_string(),
    };
    GtError::evaluation(format!(
        "candidate {candidate_index} ({config}) failed on repeat {} fold {}: {message}",
        repeat + 1,
        fold + 1
    ))
}
