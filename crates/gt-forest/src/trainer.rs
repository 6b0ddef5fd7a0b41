use gt_types::{Dataset, DatasetView, GtError, GtResult, ParameterConfiguration, Trainer};

use crate::default_mtry;
use crate::forest::{ForestParams, RandomForest};

const KNOWN_PARAMETERS: [&str; 4] = ["mtry", "ntree", "node_size", "max_depth"];

/// [`Trainer`] that fits a [`RandomForest`] from a parameter configuration.
///
/// Recognised parameters: `mtry`, `ntree`, `node_size`, `max_depth`. Absent
/// parameters fall back to the trainer's defaults; `mtry` defaults to
/// `floor(sqrt(n_features))`.
#[derive(Debug, Clone)]
pub struct RandomForestTrainer {
    ntree: usize,
    node_size: usize,
    max_depth: Option<usize>,
}

impl Default for RandomForestTrainer {
    fn default() -> Self {
        Self {
            ntree: 500,
            node_size: 1,
            max_depth: None,
        }
    }
}

impl RandomForestTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ntree(mut self, ntree: usize) -> Self {
        self.ntree = ntree;
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

    /// Resolve a configuration into concrete forest parameters.
    pub fn params_for(
        &self,
        config: &ParameterConfiguration,
        n_features: usize,
    ) -> GtResult<ForestParams> {
        if let Some(unknown) = config.names().find(|n| !KNOWN_PARAMETERS.contains(n)) {
            return Err(GtError::invalid(format!(
                "unknown random forest parameter '{unknown}'"
            )));
        }

        let mtry = positive(config, "mtry")?.unwrap_or_else(|| default_mtry(n_features));
        let ntree = positive(config, "ntree")?.unwrap_or(self.ntree);
        let node_size = positive(config, "node_size")?.unwrap_or(self.node_size);
        let max_depth = match positive(config, "max_depth")? {
            Some(d) => Some(d),
            None => self.max_depth,
        };

        let params = ForestParams::new(mtry, ntree)
            .with_node_size(node_size)
            .with_max_depth(max_depth);
        params.validate(n_features)?;
        Ok(params)
    }
}

fn positive(config: &ParameterConfiguration, name: &str) -> GtResult<Option<usize>> {
    match config.get_int(name)? {
        None => Ok(None),
        Some(v) if v >= 1 => Ok(Some(v as usize)),
        Some(v) => Err(GtError::invalid(format!(
            "{name} must be at least 1, got {v}"
        ))),
    }
}

impl Trainer for RandomForestTrainer {
    type Model = RandomForest;

    fn validate(&self, config: &ParameterConfiguration, dataset: &Dataset) -> GtResult<()> {
        self.params_for(config, dataset.n_features()).map(|_| ())
    }

    fn fit(
        &self,
        config: &ParameterConfiguration,
        train: &DatasetView<'_>,
        seed: u64,
    ) -> GtResult<RandomForest> {
        let params = self.params_for(config, train.n_features())?;
        RandomForest::fit(&params, train, seed)
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_data::SyntheticSpec;

    #[test]
    fn defaults_follow_feature_count() {
        let trainer = RandomForestTrainer::new();
        let params = trainer
            .params_for(&ParameterConfiguration::new(), 60)
            .unwrap();
        assert_eq!(params.mtry, 7);
        assert_eq!(params.ntree, 500);
        assert_eq!(params.node_size, 1);
    }

    #[test]
    fn config_overrides_defaults() {
        let trainer = RandomForestTrainer::new().with_ntree(100);
        let config = ParameterConfiguration::new()
            .with("mtry", 11i64)
            .with("ntree", 2500i64);
        let params = trainer.params_for(&config, 60).unwrap();
        assert_eq!(params.mtry, 11);
        assert_eq!(params.ntree, 2500);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let ds = SyntheticSpec::sonar_like(1).generate().unwrap();
        let trainer = RandomForestTrainer::new();

        for config in [
            ParameterConfiguration::new().with("mtry", 0i64),
            ParameterConfiguration::new().with("mtry", 61i64),
            ParameterConfiguration::new().with("ntree", -5i64),
            ParameterConfiguration::new().with("mtry", 2.5),
            ParameterConfiguration::new().with("maxnodes", 4i64),
        ] {
            let err = trainer.validate(&config, &ds).unwrap_err();
            assert!(
                matches!(err, GtError::InvalidConfiguration { .. }),
                "{config}: {err}"
            );
        }
        assert!(trainer
            .validate(&ParameterConfiguration::new().with("mtry", 60i64), &ds)
            .is_ok());
    }

    #[test]
    fn fit_uses_configuration() {
        let ds = SyntheticSpec::sonar_like(2).generate().unwrap();
        let trainer = RandomForestTrainer::new();
        let config = ParameterConfiguration::new()
            .with("mtry", 3i64)
            .with("ntree", 15i64);
        let forest = trainer.fit(&config, &ds.full_view(), 0).unwrap();
        assert_eq!(forest.n_trees(), 15);
        assert_eq!(trainer.name(), "random_forest");
    }
}
