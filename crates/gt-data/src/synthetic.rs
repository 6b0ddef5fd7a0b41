//! Reproducible synthetic classification data.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use gt_types::{Dataset, Example, GtError, GtResult};

/// Shape of a generated two-class dataset.
///
/// The first `informative` features are drawn from unit Gaussians whose mean
/// depends on the class (`±separation / 2`); the rest are pure noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub rows: usize,
    pub features: usize,
    pub informative: usize,
    #[serde(default = "default_separation")]
    pub separation: f64,
    pub seed: u64,
}

fn default_separation() -> f64 {
    1.0
}

impl SyntheticSpec {
    /// 208 rows by 60 features, the shape of the sonar benchmark.
    pub fn sonar_like(seed: u64) -> Self {
        Self {
            rows: 208,
            features: 60,
            informative: 12,
            separation: 1.0,
            seed,
        }
    }

    pub fn generate(&self) -> GtResult<Dataset> {
        if self.rows < 2 || self.features == 0 {
            return Err(GtError::invalid(format!(
                "synthetic dataset needs at least 2 rows and 1 feature, got {}x{}",
                self.rows, self.features
            )));
        }
        if self.informative > self.features {
            return Err(GtError::invalid(format!(
                "informative features ({}) exceed total features ({})",
                self.informative, self.features
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let half = self.separation / 2.0;
        let examples = (0..self.rows)
            .map(|row| {
                let label = row % 2;
                let shift = if label == 0 { -half } else { half };
                let features = (0..self.features)
                    .map(|j| {
                        let noise: f64 = rng.sample(StandardNormal);
                        if j < self.informative {
                            noise + shift
                        } else {
                            noise
                        }
                    })
                    .collect();
                Example::new(features, label)
            })
            .collect();

        tracing::debug!(
            "Generated synthetic dataset: {} rows, {} features ({} informative)",
            self.rows,
            self.features,
            self.informative
        );
        Dataset::from_examples(vec!["M".to_string(), "R".to_string()], examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sonar_like_shape() {
        let ds = SyntheticSpec::sonar_like(7).generate().unwrap();
        assert_eq!(ds.len(), 208);
        assert_eq!(ds.n_features(), 60);
        assert_eq!(ds.class_counts(), vec![104, 104]);
    }

    #[test]
    fn same_seed_same_data() {
        let a = SyntheticSpec::sonar_like(3).generate().unwrap();
        let b = SyntheticSpec::sonar_like(3).generate().unwrap();
        let c = SyntheticSpec::sonar_like(4).generate().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn informative_features_shift_class_means() {
        let spec = SyntheticSpec {
            rows: 400,
            features: 3,
            informative: 1,
            separation: 2.0,
            seed: 11,
        };
        let ds = spec.generate().unwrap();
        let mean = |label: usize, j: usize| {
            let vals: Vec<f64> = ds
                .examples()
                .iter()
                .filter(|e| e.label == label)
                .map(|e| e.features[j])
                .collect();
            vals.iter().sum::<f64>() / vals.len() as f64
        };
        assert!(mean(1, 0) - mean(0, 0) > 1.5);
        assert!((mean(1, 2) - mean(0, 2)).abs() < 0.5);
    }

    #[test]
    fn noise_columns_are_standard_normal() {
        let ds = SyntheticSpec {
            rows: 4000,
            features: 2,
            informative: 0,
            separation: 0.0,
            seed: 21,
        }
        .generate()
        .unwrap();
        let vals: Vec<f64> = ds.examples().iter().map(|e| e.features[1]).collect();
        let n = vals.len() as f64;
        let mean = vals.iter().sum::<f64>() / n;
        let var = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
    }

    #[test]
    fn rejects_too_many_informative_features() {
        let spec = SyntheticSpec {
            rows: 10,
            features: 2,
            informative: 3,
            separation: 1.0,
            seed: 0,
        };
        assert!(spec.generate().is_err());
    }
}
