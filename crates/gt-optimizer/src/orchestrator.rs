//! Drives a candidate generator through the resampling evaluator.

use crossbeam_channel::Sender;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use gt_types::{Dataset, GtError, GtResult, Metric, ParameterConfiguration, Trainer};

use crate::resampling::{ResamplingEvaluator, ResamplingPlan};
use crate::search::{candidates, CandidateGenerator};
use crate::trial::{EvaluationResult, SearchId, SearchTrace};

/// How candidate evaluations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// One candidate at a time on the calling thread.
    #[default]
    Sequential,
    /// Candidates evaluated concurrently on a dedicated pool of this many
    /// threads. Results are still merged in generation order.
    Threads(usize),
}

/// Progress notifications emitted during a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Started {
        search_id: SearchId,
        candidates: usize,
    },
    /// Sent in completion order, which differs from generation order under
    /// [`Parallelism::Threads`].
    CandidateCompleted {
        search_id: SearchId,
        candidate_index: usize,
        configuration: ParameterConfiguration,
        mean: f64,
    },
    Finished {
        search_id: SearchId,
        best_index: usize,
        best_mean: f64,
    },
}

/// The result of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub trace: SearchTrace,
    pub best: ParameterConfiguration,
}

impl SearchOutcome {
    pub fn best_result(&self) -> &EvaluationResult {
        // A successful search always has at least one result.
        &self.trace.results[self.trace.best_index.unwrap_or(0)]
    }
}

/// Evaluates every candidate of a generator under one resampling plan and
/// picks the configuration with the highest mean score.
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    plan: ResamplingPlan,
    metric: Metric,
    parallelism: Parallelism,
    events: Option<Sender<SearchEvent>>,
}

impl SearchOrchestrator {
    pub fn new(plan: ResamplingPlan) -> Self {
        Self {
            plan,
            metric: Metric::default(),
            parallelism: Parallelism::default(),
            events: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_events(mut self, events: Sender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn plan(&self) -> &ResamplingPlan {
        &self.plan
    }

    /// Run the search to completion.
    ///
    /// Every configuration is validated before the first evaluation. The
    /// first evaluation error aborts the run and is returned; there is no
    /// retry. Candidates after the failing one are not fitted sequentially;
    /// on a pool, only candidates already in flight finish.
    pub fn run<T, G>(
        &self,
        dataset: &Dataset,
        generator: &mut G,
        trainer: &T,
    ) -> GtResult<SearchOutcome>
    where
        T: Trainer,
        G: CandidateGenerator + ?Sized,
    {
        self.plan.validate()?;
        if let Parallelism::Threads(0) = self.parallelism {
            return Err(GtError::invalid("thread count must be at least 1"));
        }

        let strategy = generator.name().to_string();
        let configs: Vec<ParameterConfiguration> = candidates(generator).collect();
        if configs.is_empty() {
            return Err(GtError::EmptyCandidateSet);
        }
        for config in &configs {
            trainer.validate(config, dataset)?;
        }

        let evaluator = ResamplingEvaluator::new(dataset, self.plan.clone())?.with_metric(self.metric);
        let mut trace = SearchTrace::new(&strategy, trainer.name(), self.metric, self.plan.clone());
        info!(
            "Starting {} search {}: {} candidates, {}-fold CV x {} repeats, metric {}",
            strategy,
            trace.id,
            configs.len(),
            self.plan.folds,
            self.plan.repeats,
            self.metric
        );
        self.emit(SearchEvent::Started {
            search_id: trace.id,
            candidates: configs.len(),
        });

        let search_id = trace.id;
        let results = match self.parallelism {
            Parallelism::Sequential => configs
                .into_iter()
                .enumerate()
                .map(|(i, config)| self.evaluate_one(&evaluator, trainer, search_id, i, config))
                .collect::<GtResult<Vec<_>>>()?,
            Parallelism::Threads(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| GtError::evaluation(format!("failed to start worker pool: {e}")))?;
                // Set by the first failure; candidates not yet started are skipped.
                let aborted = AtomicBool::new(false);
                let evaluated = pool.install(|| {
                    configs
                        .into_par_iter()
                        .enumerate()
                        .map(|(i, config)| {
                            if aborted.load(Ordering::Relaxed) {
                                return Ok(None);
                            }
                            self.evaluate_one(&evaluator, trainer, search_id, i, config)
                                .map(Some)
                                .inspect_err(|_| aborted.store(true, Ordering::Relaxed))
                        })
                        .collect::<GtResult<Vec<_>>>()
                })?;
                evaluated.into_iter().flatten().collect()
            }
        };

        for result in results {
            trace.push(result);
        }
        trace.mark_finished();

        let best = trace
            .best()
            .ok_or(GtError::EmptyCandidateSet)?
            .clone();
        info!(
            "Search {} finished: best {} with mean {} {:.4} (sd {:.4})",
            trace.id,
            best.configuration,
            self.metric,
            best.mean(),
            best.std_dev()
        );
        self.emit(SearchEvent::Finished {
            search_id: trace.id,
            best_index: best.candidate_index,
            best_mean: best.mean(),
        });

        Ok(SearchOutcome {
            trace,
            best: best.configuration,
        })
    }

    fn evaluate_one<T: Trainer>(
        &self,
        evaluator: &ResamplingEvaluator<'_>,
        trainer: &T,
        search_id: SearchId,
        index: usize,
        configuration: ParameterConfiguration,
    ) -> GtResult<EvaluationResult> {
        let started = Instant::now();
        let scores = evaluator.evaluate(trainer, &configuration, index)?;
        let result = EvaluationResult {
            candidate_index: index,
            configuration,
            scores,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            "candidate {} ({}): mean {:.4} sd {:.4} in {} ms",
            index,
            result.configuration,
            result.mean(),
            result.std_dev(),
            result.duration_ms
        );
        self.emit(SearchEvent::CandidateCompleted {
            search_id,
            candidate_index: index,
            configuration: result.configuration.clone(),
            mean: result.mean(),
        });
        Ok(result)
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }
}
