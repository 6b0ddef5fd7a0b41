//! Bagged ensemble of `linfa` decision trees.

use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use gt_types::{derive_seed, Classifier, DatasetView, GtError, GtResult};

/// Hyperparameters of a random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees.
    pub ntree: usize,
    /// Number of features each tree is allowed to split on.
    pub mtry: usize,
    /// Minimum number of rows in a leaf.
    pub node_size: usize,
    pub max_depth: Option<usize>,
}

impl ForestParams {
    pub fn new(mtry: usize, ntree: usize) -> Self {
        Self {
            ntree,
            mtry,
            node_size: 1,
            max_depth: None,
        }
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
        if self.mtry == 0 || self.mtry > n_features {
            return Err(GtError::invalid(format!(
                "mtry must be in 1..={n_features}, got {}",
                self.mtry
            )));
        }
        if self.ntree == 0 {
            return Err(GtError::invalid("ntree must be at least 1"));
        }
        if self.node_size == 0 {
            return Err(GtError::invalid("node_size must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(GtError::invalid("max_depth must be at least 1 when set"));
        }
        Ok(())
    }
}

/// One tree plus the feature columns it was grown on.
struct Member {
    tree: DecisionTree<f64, usize>,
    features: Vec<usize>,
}

impl Member {
    fn predict(&self, records: &ArrayView2<'_, f64>) -> Array1<usize> {
        use linfa::traits::Predict;

        let columns = records.select(Axis(1), &self.features);
        self.tree.predict(&columns)
    }
}

/// A fitted random forest.
pub struct RandomForest {
    members: Vec<Member>,
    n_classes: usize,
    oob_error: Option<f64>,
}

impl RandomForest {
    /// Grow `params.ntree` trees on bootstrap samples of `train`.
    ///
    /// Tree `t` draws its bootstrap rows and its `mtry` feature columns from
    /// an RNG seeded by `(seed, t)`, so the fitted forest does not depend on
    /// how rayon schedules the work.
    pub fn fit(params: &ForestParams, train: &DatasetView<'_>, seed: u64) -> GtResult<Self> {
        params.validate(train.n_features())?;
        if train.is_empty() {
            return Err(GtError::evaluation("cannot fit a forest on an empty sample"));
        }

        let records = train.records();
        let labels = train.targets();
        let n = records.nrows();
        let n_classes = train.n_classes();

        let grown = (0..params.ntree)
            .into_par_iter()
            .map(|t| grow_member(params, &records, &labels, derive_seed(seed, &[t as u64]), t))
            .collect::<GtResult<Vec<_>>>()?;

        let mut votes = Array2::<usize>::zeros((n, n_classes));
        let mut members = Vec::with_capacity(grown.len());
        for (member, oob_votes) in grown {
            for (row, class) in oob_votes {
                votes[[row, class]] += 1;
            }
            members.push(member);
        }

        let mut voted = 0usize;
        let mut wrong = 0usize;
        for (row, counts) in votes.outer_iter().enumerate() {
            if counts.sum() == 0 {
                continue;
            }
            voted += 1;
            if majority(counts.iter().copied()) != labels[row] {
                wrong += 1;
            }
        }
        let oob_error = (voted > 0).then(|| wrong as f64 / voted as f64);

        tracing::debug!(
            "Grew forest: ntree={}, mtry={}, rows={}, oob_error={:?}",
            params.ntree,
            params.mtry,
            n,
            oob_error
        );

        Ok(Self {
            members,
            n_classes,
            oob_error,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.members.len()
    }

    /// Feature columns available to each tree, in tree order.
    pub fn tree_features(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.members.iter().map(|m| m.features.as_slice())
    }

    /// Out-of-bag misclassification rate; `None` when every row was in every
    /// bootstrap sample.
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    /// Per-class vote counts, one row per row of `records`.
    pub fn votes(&self, records: ArrayView2<'_, f64>) -> Array2<usize> {
        let mut counts = Array2::zeros((records.nrows(), self.n_classes));
        for member in &self.members {
            for (row, &class) in member.predict(&records).iter().enumerate() {
                counts[[row, class]] += 1;
            }
        }
        counts
    }
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("n_trees", &self.members.len())
            .field("n_classes", &self.n_classes)
            .field("oob_error", &self.oob_error)
            .finish()
    }
}

impl Classifier for RandomForest {
    fn predict(&self, records: ArrayView2<'_, f64>) -> Array1<usize> {
        self.votes(records)
            .outer_iter()
            .map(|counts| majority(counts.iter().copied()))
            .collect()
    }
}

type OobVotes = Vec<(usize, usize)>;

fn grow_member(
    params: &ForestParams,
    records: &Array2<f64>,
    labels: &Array1<usize>,
    seed: u64,
    t: usize,
) -> GtResult<(Member, OobVotes)> {
    use linfa::traits::Fit;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = records.nrows();

    let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
    let mut features = index::sample(&mut rng, records.ncols(), params.mtry).into_vec();
    features.sort_unstable();

    let bag = linfa::Dataset::new(
        records.select(Axis(0), &sample).select(Axis(1), &features),
        labels.select(Axis(0), &sample),
    );
    let tree = DecisionTree::<f64, usize>::params()
        .split_quality(SplitQuality::Gini)
        .max_depth(params.max_depth)
        .min_weight_leaf(params.node_size as f32)
        .fit(&bag)
        .map_err(|e| GtError::evaluation(format!("tree {t} failed to fit: {e}")))?;
    let member = Member { tree, features };

    let mut in_bag = vec![false; n];
    for &row in &sample {
        in_bag[row] = true;
    }
    let oob_rows: Vec<usize> = (0..n).filter(|&row| !in_bag[row]).collect();
    if oob_rows.is_empty() {
        return Ok((member, Vec::new()));
    }
    let predicted = member.predict(&records.select(Axis(0), &oob_rows).view());
    let oob_votes = oob_rows.into_iter().zip(predicted.iter().copied()).collect();
    Ok((member, oob_votes))
}

/// Index of the largest count; ties go to the lowest class index.
fn majority(counts: impl Iterator<Item = usize>) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (class, count) in counts.enumerate() {
        if count > best_count {
            best = class;
            best_count = count;
        }
    }
    best
}
