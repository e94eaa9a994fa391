//! CART regression trees and a bagged random forest over them.
//!
//! Trees work on index slices into the shared training matrix, so a bootstrap
//! sample is just a vector of (possibly repeated) row indices.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RulError};
use crate::ml::Matrix;

/// Anything that maps a feature matrix to one prediction per row.
pub trait Regressor {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    #[default]
    SquaredError,
    /// Half Poisson deviance; targets must be non-negative.
    Poisson,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    #[default]
    All,
    Sqrt,
    Log2,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: SplitCriterion,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self { max_depth: None, min_samples_split: 2, min_samples_leaf: 1, criterion: SplitCriterion::SquaredError, max_features: MaxFeatures::All }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct Best { feature: usize, threshold: f64, position: usize, gain: f64 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    params: TreeParams,
    root: Option<Node>,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self { Self::new(TreeParams::default()) }
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self { Self { params, root: None, n_features: 0 } }

    pub fn depth(&self) -> usize { self.root.as_ref().map(Node::depth).unwrap_or(0) }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        let idx: Vec<usize> = (0..x.n_rows()).collect();
        self.fit_indices(x, y, idx, &mut StdRng::seed_from_u64(0))
    }

    pub(crate) fn fit_indices(&mut self, x: &Matrix, y: &[f64], mut idx: Vec<usize>, rng: &mut StdRng) -> Result<()> {
        check_training_data(x, y, self.params.criterion)?;
        self.n_features = x.n_cols();
        self.root = Some(self.build(x, y, &mut idx, 0, rng));
        Ok(())
    }

    fn build(&self, x: &Matrix, y: &[f64], idx: &mut [usize], depth: usize, rng: &mut StdRng) -> Node {
        let n = idx.len();
        let sum: f64 = idx.iter().map(|&i| y[i]).sum();
        let leaf = Node::Leaf { value: sum / n as f64 };
        let p = &self.params;
        if n < p.min_samples_split || n < 2 * p.min_samples_leaf || p.max_depth.map(|d| depth >= d).unwrap_or(false) {
            return leaf;
        }
        if idx.iter().all(|&i| (y[i] - y[idx[0]]).abs() < 1e-12) { return leaf; }

        // Visit at least `k` random features; keep drawing past `k` only while no valid split exists.
        let k = p.max_features.resolve(self.n_features);
        let mut order: Vec<usize> = (0..self.n_features).collect();
        order.shuffle(rng);
        let parent = node_proxy(p.criterion, sum, n);
        let mut best: Option<Best> = None;
        for (visited, &f) in order.iter().enumerate() {
            if visited >= k && best.is_some() { break; }
            idx.sort_by(|&a, &b| x.get(a, f).total_cmp(&x.get(b, f)));
            let mut left_sum = 0.0;
            for pos in 1..n {
                left_sum += y[idx[pos - 1]];
                if pos < p.min_samples_leaf || n - pos < p.min_samples_leaf { continue; }
                let (lo, hi) = (x.get(idx[pos - 1], f), x.get(idx[pos], f));
                if lo == hi { continue; }
                let right_sum = sum - left_sum;
                if p.criterion == SplitCriterion::Poisson && (left_sum <= 0.0 || right_sum <= 0.0) { continue; }
                let gain = node_proxy(p.criterion, left_sum, pos) + node_proxy(p.criterion, right_sum, n - pos) - parent;
                if gain > 1e-12 && best.as_ref().map(|b| gain > b.gain).unwrap_or(true) {
                    best = Some(Best { feature: f, threshold: lo + (hi - lo) / 2.0, position: pos, gain });
                }
            }
        }
        let Some(b) = best else { return leaf };
        idx.sort_by(|&a, &c| x.get(a, b.feature).total_cmp(&x.get(c, b.feature)));
        let (l, r) = idx.split_at_mut(b.position);
        let left = self.build(x, y, l, depth + 1, rng);
        let right = self.build(x, y, r, depth + 1, rng);
        Node::Split { feature: b.feature, threshold: b.threshold, left: Box::new(left), right: Box::new(right) }
    }

    fn predict_row(&self, root: &Node, row: &[f64]) -> f64 {
        let mut node = root;
        loop {
            match node {
                Node::Leaf { value, .. } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        let root = self.root.as_ref().ok_or_else(|| RulError::invalid("tree not fitted"))?;
        check_width(self.n_features, x)?;
        Ok(x.rows_iter().map(|row| self.predict_row(root, row)).collect())
    }
}

/// Quantity whose increase across a split equals the impurity decrease
/// (up to a constant shared by all candidate splits of a node).
fn node_proxy(criterion: SplitCriterion, sum: f64, n: usize) -> f64 {
    match criterion {
        SplitCriterion::SquaredError => sum * sum / n as f64,
        SplitCriterion::Poisson => if sum <= 0.0 { 0.0 } else { sum * (sum / n as f64).ln() },
    }
}

fn check_training_data(x: &Matrix, y: &[f64], criterion: SplitCriterion) -> Result<()> {
    if x.n_rows() == 0 { return Err(RulError::invalid("cannot fit with zero samples")); }
    if x.n_rows() != y.len() { return Err(RulError::invalid(format!("{} samples but {} targets", x.n_rows(), y.len()))); }
    if x.rows_iter().flatten().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(RulError::invalid("training data contains missing or infinite values"));
    }
    if criterion == SplitCriterion::Poisson && y.iter().any(|v| *v < 0.0) {
        return Err(RulError::invalid("poisson criterion requires non-negative targets"));
    }
    Ok(())
}

fn check_width(expected: usize, x: &Matrix) -> Result<()> {
    if x.n_cols() != expected {
        return Err(RulError::SchemaMismatch(format!("model fitted on {expected} features, got {}", x.n_cols())));
    }
    Ok(())
}

/// Bagged ensemble of [`DecisionTreeRegressor`]s; predictions are the mean
/// over trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    params: TreeParams,
    random_state: Option<u64>,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self { Self::new(100) }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self { n_estimators: n_estimators.max(1), params: TreeParams::default(), random_state: None, trees: Vec::new(), n_features: 0 }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self { self.params.max_depth = depth; self }
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self { self.params.min_samples_leaf = n.max(1); self }
    pub fn with_criterion(mut self, c: SplitCriterion) -> Self { self.params.criterion = c; self }
    pub fn with_max_features(mut self, m: MaxFeatures) -> Self { self.params.max_features = m; self }
    pub fn with_random_state(mut self, seed: u64) -> Self { self.random_state = Some(seed); self }

    pub fn n_trees(&self) -> usize { self.trees.len() }
    pub fn n_features(&self) -> usize { self.n_features }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        check_training_data(x, y, self.params.criterion)?;
        let n = x.n_rows();
        let base = self.random_state.unwrap_or_else(|| rand::thread_rng().gen());
        let mut trees = Vec::with_capacity(self.n_estimators);
        for i in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(base.wrapping_add(i as u64));
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut tree = DecisionTreeRegressor::new(self.params);
            tree.fit_indices(x, y, bootstrap, &mut rng)?;
            trees.push(tree);
        }
        self.trees = trees;
        self.n_features = x.n_cols();
        Ok(())
    }
}

impl Regressor for RandomForestRegressor {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        if self.trees.is_empty() { return Err(RulError::invalid("forest not fitted")); }
        check_width(self.n_features, x)?;
        let mut out = vec![0.0; x.n_rows()];
        for tree in &self.trees {
            for (acc, p) in out.iter_mut().zip(tree.predict(x)?) { *acc += p; }
        }
        let k = self.trees.len() as f64;
        out.iter_mut().for_each(|v| *v /= k);
        Ok(out)
    }
}
