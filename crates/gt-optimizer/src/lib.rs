//! # gt-optimizer
//!
//! Hyperparameter search orchestration for GroveTune.
//!
//! Provides search space definitions, candidate generation policies (grid,
//! random, manual), a repeated k-fold cross-validation evaluator, the search
//! orchestrator that ties them together, and ranked reporting of the
//! resulting trace.

mod orchestrator;
mod report;
mod resampling;
mod search;
mod trial;

pub use orchestrator::{Parallelism, SearchEvent, SearchOrchestrator, SearchOutcome};
pub use report::{ReportRow, ScoreSummary, SearchReport};
pub use resampling::{Partitions, ResamplingEvaluator, ResamplingPlan};
pub use search::{
    candidates, CandidateGenerator, Candidates, GeneratorSpec, GridSearch, ManualSearch,
    ParameterDef, ParameterKind, RandomSearch, SearchSpace,
};
pub use trial::{select_best, EvaluationResult, SearchId, SearchTrace};
