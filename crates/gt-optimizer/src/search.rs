//! Search space definitions and candidate generation policies.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use gt_types::{GtError, GtResult, ParameterConfiguration, ParameterValue};

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as understood by the trainer (e.g. "mtry").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    FloatRange { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Explicit candidate values, kept in declared order.
    Choice { values: Vec<ParameterValue> },
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: impl Into<String>, kind: ParameterKind) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn add_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.push(name, ParameterKind::FloatRange { low, high })
    }

    pub fn add_int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.push(name, ParameterKind::IntRange { low, high })
    }

    pub fn add_log_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.push(name, ParameterKind::LogUniform { low, high })
    }

    pub fn add_choice<V: Into<ParameterValue>>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(name, ParameterKind::Choice { values })
    }

    /// Total number of grid points (returns `None` if any parameter is
    /// continuous without a natural grid).
    pub fn grid_size(&self) -> Option<usize> {
        let mut total: usize = 1;
        for param in &self.parameters {
            let dim_size = match &param.kind {
                ParameterKind::IntRange { low, high } => int_span(*low, *high)?,
                ParameterKind::Choice { values } => values.len(),
                // continuous axes have no natural grid size
                _ => return None,
            };
            total = total.checked_mul(dim_size)?;
        }
        Some(total)
    }

    pub fn validate(&self) -> GtResult<()> {
        if self.parameters.is_empty() {
            return Err(GtError::invalid("search space has no parameters"));
        }
        let mut names = HashSet::new();
        for param in &self.parameters {
            if !names.insert(param.name.as_str()) {
                return Err(GtError::invalid(format!(
                    "parameter '{}' is declared twice",
                    param.name
                )));
            }
            let ok = match &param.kind {
                ParameterKind::FloatRange { low, high } => {
                    low <= high && (high - low).is_finite()
                }
                ParameterKind::IntRange { low, high } => low <= high,
                ParameterKind::LogUniform { low, high } => {
                    *low > 0.0 && low <= high && (high.ln() - low.ln()).is_finite()
                }
                ParameterKind::Choice { values } => !values.is_empty(),
            };
            if !ok {
                return Err(GtError::invalid(format!(
                    "parameter '{}' has an empty or invalid range: {:?}",
                    param.name, param.kind
                )));
            }
        }
        Ok(())
    }
}

/// Number of integers in `low..=high`, if it fits in a `usize`.
fn int_span(low: i64, high: i64) -> Option<usize> {
    usize::try_from((i128::from(high) - i128::from(low) + 1).max(0)).ok()
}

/// One grid dimension. Integer ranges are indexed without being materialized.
#[derive(Debug, Clone)]
enum GridAxis {
    Ints { low: i64, len: usize },
    Values(Vec<ParameterValue>),
}

impl GridAxis {
    fn new(name: &str, kind: &ParameterKind, float_steps: usize) -> GtResult<Self> {
        let steps = float_steps.max(2);
        let spaced = |low: f64, high: f64| -> Vec<f64> {
            (0..steps)
                .map(|i| low + (i as f64 / (steps - 1) as f64) * (high - low))
                .collect()
        };
        Ok(match kind {
            ParameterKind::IntRange { low, high } => {
                let len = int_span(*low, *high).ok_or_else(|| {
                    GtError::invalid(format!("parameter '{name}' has too many values for a grid"))
                })?;
                Self::Ints { low: *low, len }
            }
            ParameterKind::FloatRange { low, high } => Self::Values(
                spaced(*low, *high)
                    .into_iter()
                    .map(ParameterValue::Float)
                    .collect(),
            ),
            ParameterKind::LogUniform { low, high } => Self::Values(
                spaced(low.ln(), high.ln())
                    .into_iter()
                    .map(|v| ParameterValue::Float(v.exp()))
                    .collect(),
            ),
            ParameterKind::Choice { values } => Self::Values(values.clone()),
        })
    }

    fn len(&self) -> usize {
        match self {
            Self::Ints { len, .. } => *len,
            Self::Values(values) => values.len(),
        }
    }

    fn value(&self, i: usize) -> ParameterValue {
        match self {
            // i < len, so the offset stays inside the declared range
            Self::Ints { low, .. } => ParameterValue::Int((i128::from(*low) + i as i128) as i64),
            Self::Values(values) => values[i].clone(),
        }
    }
}

fn sample_value<R: Rng>(kind: &ParameterKind, rng: &mut R) -> ParameterValue {
    match kind {
        ParameterKind::FloatRange { low, high } => {
            ParameterValue::Float(rng.random_range(*low..=*high))
        }
        ParameterKind::IntRange { low, high } => ParameterValue::Int(rng.random_range(*low..=*high)),
        ParameterKind::LogUniform { low, high } => {
            let log_val: f64 = rng.random_range(low.ln()..=high.ln());
            ParameterValue::Float(log_val.exp())
        }
        ParameterKind::Choice { values } => values[rng.random_range(0..values.len())].clone(),
    }
}

// ---------------------------------------------------------------------------
// Candidate generators
// ---------------------------------------------------------------------------

/// Common capability of all candidate generation policies.
///
/// A generator yields a finite sequence of configurations and is consumed by
/// a single search run.
pub trait CandidateGenerator: Send {
    /// The next configuration, or `None` when exhausted.
    fn next_candidate(&mut self) -> Option<ParameterConfiguration>;

    /// Upper bound on the configurations still to come, when known.
    fn remaining(&self) -> Option<usize>;

    /// Human-readable policy name.
    fn name(&self) -> &str;

    /// Take up to `count` configurations.
    fn suggest(&mut self, count: usize) -> Vec<ParameterConfiguration> {
        let mut batch = Vec::with_capacity(count.min(self.remaining().unwrap_or(count)));
        while batch.len() < count {
            match self.next_candidate() {
                Some(c) => batch.push(c),
                None => break,
            }
        }
        batch
    }
}

/// Iterator view over any generator.
pub struct Candidates<'a, G: ?Sized>(&'a mut G);

impl<G: CandidateGenerator + ?Sized> Iterator for Candidates<'_, G> {
    type Item = ParameterConfiguration;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_candidate()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.0.remaining())
    }
}

/// Borrow a generator as an [`Iterator`].
pub fn candidates<G: CandidateGenerator + ?Sized>(generator: &mut G) -> Candidates<'_, G> {
    Candidates(generator)
}

// ---- Grid search ----

/// Exhaustive grid search over the Cartesian product of all axes.
///
/// Enumeration is lazy and lexicographic in declared order: the first
/// parameter varies slowest, the last fastest.
#[derive(Debug, Clone)]
pub struct GridSearch {
    axes: Vec<(String, GridAxis)>,
    cursor: usize,
    total: usize,
}

impl GridSearch {
    /// `float_steps` is the number of points used for continuous axes.
    pub fn new(space: SearchSpace, float_steps: usize) -> GtResult<Self> {
        space.validate()?;
        let axes = space
            .parameters
            .into_iter()
            .map(|p| GridAxis::new(&p.name, &p.kind, float_steps).map(|axis| (p.name, axis)))
            .collect::<GtResult<Vec<_>>>()?;
        let total = axes
            .iter()
            .try_fold(1usize, |acc, (_, axis)| acc.checked_mul(axis.len()))
            .ok_or_else(|| GtError::invalid("grid is too large to enumerate"))?;
        Ok(Self {
            axes,
            cursor: 0,
            total,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn combination(&self, mut index: usize) -> ParameterConfiguration {
        let mut picks = vec![0usize; self.axes.len()];
        for (slot, (_, axis)) in picks.iter_mut().zip(&self.axes).rev() {
            *slot = index % axis.len();
            index /= axis.len();
        }
        self.axes
            .iter()
            .zip(picks)
            .map(|((name, axis), i)| (name.clone(), axis.value(i)))
            .collect()
    }
}

impl CandidateGenerator for GridSearch {
    fn next_candidate(&mut self) -> Option<ParameterConfiguration> {
        if self.cursor >= self.total {
            return None;
        }
        let combo = self.combination(self.cursor);
        self.cursor += 1;
        Some(combo)
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.total - self.cursor)
    }

    fn name(&self) -> &str {
        "grid"
    }
}

// ---- Random search ----

/// Independent uniform sampling across the search space.
///
/// The sequence depends only on the space, the count and the seed.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    rng: ChaCha8Rng,
    target: usize,
    drawn: usize,
    unique: bool,
    seen: Vec<ParameterConfiguration>,
}

impl RandomSearch {
    pub fn new(space: SearchSpace, count: usize, seed: u64) -> GtResult<Self> {
        space.validate()?;
        Ok(Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
            target: count,
            drawn: 0,
            unique: false,
            seen: Vec::new(),
        })
    }

    /// Skip configurations that were already drawn. On a discrete space the
    /// count is capped at the grid size.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        if let Some(size) = self.space.grid_size() {
            self.target = self.target.min(size);
        }
        self
    }

    fn sample_one(&mut self) -> ParameterConfiguration {
        let mut config = ParameterConfiguration::new();
        for param in &self.space.parameters {
            config.insert(param.name.clone(), sample_value(&param.kind, &mut self.rng));
        }
        config
    }
}

impl CandidateGenerator for RandomSearch {
    fn next_candidate(&mut self) -> Option<ParameterConfiguration> {
        if self.drawn >= self.target {
            return None;
        }
        if !self.unique {
            self.drawn += 1;
            return Some(self.sample_one());
        }

        // Bounded rejection sampling; a continuous space practically never
        // repeats, a discrete one is capped at its grid size.
        for _ in 0..1000 {
            let config = self.sample_one();
            if !self.seen.contains(&config) {
                self.seen.push(config.clone());
                self.drawn += 1;
                return Some(config);
            }
        }
        tracing::warn!(
            "random search gave up on unique draws after {} configurations",
            self.drawn
        );
        self.target = self.drawn;
        None
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.target - self.drawn)
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ---- Manual search ----

/// A caller-supplied, ordered list of configurations.
#[derive(Debug, Clone, Default)]
pub struct ManualSearch {
    queue: VecDeque<ParameterConfiguration>,
}

impl ManualSearch {
    pub fn new(configs: impl IntoIterator<Item = ParameterConfiguration>) -> Self {
        Self {
            queue: configs.into_iter().collect(),
        }
    }

    /// One configuration per value of `name`, all other parameters taken
    /// from `base`.
    pub fn vary<V: Into<ParameterValue>>(
        base: &ParameterConfiguration,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| base.clone().with(name, v)),
        )
    }
}

impl CandidateGenerator for ManualSearch {
    fn next_candidate(&mut self) -> Option<ParameterConfiguration> {
        self.queue.pop_front()
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.queue.len())
    }

    fn name(&self) -> &str {
        "manual"
    }
}

// ---- Serializable policy selection ----

fn default_float_steps() -> usize {
    5
}

/// Declarative choice of generator, e.g. from a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    Random {
        space: SearchSpace,
        count: usize,
        seed: u64,
        #[serde(default)]
        unique: bool,
    },
    Grid {
        space: SearchSpace,
        #[serde(default = "default_float_steps")]
        float_steps: usize,
    },
    Manual {
        candidates: Vec<ParameterConfiguration>,
    },
}

impl GeneratorSpec {
    /// Build a fresh generator for one search run.
    pub fn build(&self) -> GtResult<Box<dyn CandidateGenerator>> {
        Ok(match self {
            Self::Random {
                space,
                count,
                seed,
                unique,
            } => {
                let search = RandomSearch::new(space.clone(), *count, *seed)?;
                if *unique {
                    Box::new(search.unique())
                } else {
                    Box::new(search)
                }
            }
            Self::Grid { space, float_steps } => {
                Box::new(GridSearch::new(space.clone(), *float_steps)?)
            }
            Self::Manual { candidates } => Box::new(ManualSearch::new(candidates.clone())),
        })
    }
}
