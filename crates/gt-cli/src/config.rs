//! JSON run configuration for `gt-tune`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gt_data::{CsvLoader, SyntheticSpec};
use gt_forest::{OobStepSearch, RandomForestTrainer};
use gt_optimizer::{GeneratorSpec, Parallelism, ResamplingPlan};
use gt_types::{config_error, Dataset, GtResult, Metric};

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DatasetSource {
    Csv {
        path: PathBuf,
        /// Defaults to the last column.
        #[serde(default)]
        label_column: Option<String>,
    },
    Synthetic(SyntheticSpec),
}

impl DatasetSource {
    pub fn load(&self) -> GtResult<Dataset> {
        match self {
            Self::Csv { path, label_column } => {
                let loader = match label_column {
                    Some(name) => CsvLoader::new().with_label_column(name.clone()),
                    None => CsvLoader::new(),
                };
                loader.load(path)
            }
            Self::Synthetic(spec) => spec.generate(),
        }
    }
}

/// Random forest settings applied when a candidate does not set them. An
/// OOB step search takes its `node_size` and `max_depth` from here too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestDefaults {
    pub ntree: usize,
    pub node_size: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestDefaults {
    fn default() -> Self {
        Self {
            ntree: 500,
            node_size: 1,
            max_depth: None,
        }
    }
}

impl ForestDefaults {
    pub fn trainer(&self) -> RandomForestTrainer {
        RandomForestTrainer::new()
            .with_ntree(self.ntree)
            .with_node_size(self.node_size)
            .with_max_depth(self.max_depth)
    }
}

/// Top-level configuration of one tuning run.
///
/// Exactly one of `search` (cross-validated search) or `oob_step`
/// (out-of-bag step search) must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    pub dataset: DatasetSource,
    #[serde(default)]
    pub plan: ResamplingPlan,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub search: Option<GeneratorSpec>,
    #[serde(default)]
    pub oob_step: Option<OobStepSearch>,
    #[serde(default)]
    pub parallelism: Parallelism,
    #[serde(default)]
    pub forest: ForestDefaults,
    /// Write the trace (or OOB step result) here as JSON.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl TuningConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> GtResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading tuning config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> GtResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GtResult<()> {
        match (&self.search, &self.oob_step) {
            (Some(_), Some(_)) => Err(config_error!(
                "set either 'search' or 'oob_step', not both"
            )),
            (None, None) => Err(config_error!("one of 'search' or 'oob_step' is required")),
            (Some(_), None) => self.plan.validate(),
            (None, Some(_)) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_types::GtError;

    #[test]
    fn minimal_grid_config_uses_defaults() {
        let config = TuningConfig::from_json(
            r#"{
                "dataset": { "source": "csv", "path": "sonar.csv" },
                "search": {
                    "kind": "grid",
                    "space": { "parameters": [
                        { "name": "mtry", "kind": { "int_range": { "low": 1, "high": 15 } } }
                    ] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.plan, ResamplingPlan::new(10, 3, 7));
        assert_eq!(config.metric, Metric::Accuracy);
        assert_eq!(config.parallelism, Parallelism::Sequential);
        assert_eq!(config.forest.ntree, 500);
        assert!(config.output_path.is_none());
        match &config.dataset {
            DatasetSource::Csv { path, label_column } => {
                assert_eq!(path, &PathBuf::from("sonar.csv"));
                assert!(label_column.is_none());
            }
            other => panic!("unexpected dataset: {other:?}"),
        }
    }

    #[test]
    fn oob_step_config_with_synthetic_data() {
        let config = TuningConfig::from_json(
            r#"{
                "dataset": { "source": "synthetic", "rows": 80, "features": 10, "informative": 3, "seed": 4 },
                "oob_step": { "ntree_try": 25, "step_factor": 1.5 },
                "parallelism": { "threads": 2 }
            }"#,
        )
        .unwrap();

        let oob = config.oob_step.as_ref().unwrap();
        assert_eq!(oob.ntree_try, 25);
        assert_eq!(oob.step_factor, 1.5);
        assert_eq!(oob.improve, 0.05);
        assert_eq!(config.parallelism, Parallelism::Threads(2));

        let ds = config.dataset.load().unwrap();
        assert_eq!(ds.len(), 80);
        assert_eq!(ds.n_features(), 10);
    }

    #[test]
    fn strategy_must_be_exactly_one() {
        let neither = r#"{ "dataset": { "source": "csv", "path": "x.csv" } }"#;
        assert!(matches!(
            TuningConfig::from_json(neither).unwrap_err(),
            GtError::Config(_)
        ));

        let both = r#"{
            "dataset": { "source": "csv", "path": "x.csv" },
            "search": { "kind": "manual", "candidates": [] },
            "oob_step": {}
        }"#;
        assert!(matches!(
            TuningConfig::from_json(both).unwrap_err(),
            GtError::Config(_)
        ));
    }

    #[test]
    fn plan_is_validated_up_front() {
        let err = TuningConfig::from_json(
            r#"{
                "dataset": { "source": "csv", "path": "x.csv" },
                "plan": { "folds": 1, "repeats": 3, "seed": 7 },
                "search": { "kind": "manual", "candidates": [ { "mtry": 3 } ] }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, GtError::InvalidConfiguration { .. }));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = TuningConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GtError::Serialization(_)));
    }

    #[test]
    fn demo_configs_parse() {
        for text in [
            include_str!("../../../demos/sonar_grid.json"),
            include_str!("../../../demos/sonar_random.json"),
            include_str!("../../../demos/sonar_ntree.json"),
            include_str!("../../../demos/sonar_oob_step.json"),
        ] {
            let config = TuningConfig::from_json(text).unwrap();
            assert_eq!(config.dataset.load().unwrap().n_features(), 60);
        }
    }

    #[test]
    fn forest_defaults_build_trainer() {
        let defaults = ForestDefaults {
            ntree: 40,
            node_size: 3,
            max_depth: Some(6),
        };
        let params = defaults
            .trainer()
            .params_for(&gt_types::ParameterConfiguration::new(), 16)
            .unwrap();
        assert_eq!(params.ntree, 40);
        assert_eq!(params.node_size, 3);
        assert_eq!(params.max_depth, Some(6));
        assert_eq!(params.mtry, 4);
    }
}
