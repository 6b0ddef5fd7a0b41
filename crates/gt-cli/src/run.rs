use std::fmt;
use std::path::Path;

use gt_forest::{OobStepResult, OobStepSearch};
use gt_optimizer::{Parallelism, SearchOrchestrator, SearchOutcome, SearchReport};
use gt_types::{config_error, Dataset, GtError, GtResult};

use crate::config::TuningConfig;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub enum RunSummary {
    Search {
        outcome: SearchOutcome,
        report: SearchReport,
    },
    OobStep(OobStepResult),
}

/// Load the dataset, run the configured strategy and write the output file
/// if one is configured.
pub fn execute(config: &TuningConfig) -> GtResult<RunSummary> {
    config.validate()?;
    let dataset = config.dataset.load()?;

    let summary = match (&config.search, &config.oob_step) {
        (Some(spec), None) => {
            let mut generator = spec.build()?;
            let trainer = config.forest.trainer();
            let outcome = SearchOrchestrator::new(config.plan.clone())
                .with_metric(config.metric)
                .with_parallelism(config.parallelism)
                .run(&dataset, generator.as_mut(), &trainer)?;
            let report = SearchReport::from_trace(&outcome.trace);
            if let Some(path) = &config.output_path {
                write_output(path, &outcome.trace.to_json()?)?;
            }
            RunSummary::Search { outcome, report }
        }
        (None, Some(oob)) => {
            let search = oob_search(oob, config);
            let result = run_oob(&search, &dataset, config.parallelism)?;
            if let Some(path) = &config.output_path {
                write_output(path, &serde_json::to_string_pretty(&result)?)?;
            }
            RunSummary::OobStep(result)
        }
        _ => return Err(config_error!("exactly one of 'search' or 'oob_step' is required")),
    };
    Ok(summary)
}

/// The configured OOB step search with the run's `forest` tree shape.
pub fn oob_search(oob: &OobStepSearch, config: &TuningConfig) -> OobStepSearch {
    oob.clone()
        .with_node_size(config.forest.node_size)
        .with_max_depth(config.forest.max_depth)
}

/// `Threads(n)` grows the forests on a dedicated pool of `n` threads.
fn run_oob(
    search: &OobStepSearch,
    dataset: &Dataset,
    parallelism: Parallelism,
) -> GtResult<OobStepResult> {
    match parallelism {
        Parallelism::Sequential => search.run(dataset),
        Parallelism::Threads(0) => Err(GtError::invalid("thread count must be at least 1")),
        Parallelism::Threads(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| GtError::evaluation(format!("failed to start worker pool: {e}")))?;
            pool.install(|| search.run(dataset))
        }
    }
}

fn write_output(path: &Path, json: &str) -> GtResult<()> {
    std::fs::write(path, json)?;
    tracing::info!("Wrote results to {}", path.display());
    Ok(())
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search { outcome, report } => {
                write!(f, "{report}")?;
                let best = outcome.best_result();
                write!(
                    f,
                    "best: {} ({} {:.4} +/- {:.4})",
                    outcome.best,
                    outcome.trace.metric,
                    best.mean(),
                    best.std_dev()
                )
            }
            Self::OobStep(result) => {
                writeln!(f, "{:>6}  {:>9}", "mtry", "oob_error")?;
                for step in &result.steps {
                    writeln!(f, "{:>6}  {:>9.4}", step.mtry, step.oob_error)?;
                }
                write!(
                    f,
                    "best: mtry={} (oob error {:.4})",
                    result.best.mtry, result.best.oob_error
                )
            }
        }
    }
}
