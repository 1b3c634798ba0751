//! CART regression tree
//!
//! Trees are grown on a subset of row indices so the forest can pass
//! bootstrap samples and the booster can pass residual targets without
//! copying the feature matrix. Splits minimise the summed squared error of
//! the two children and are found with a sorted sweep per candidate feature.

use crate::{MathError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Relative gain below which a split is treated as rounding noise
const MIN_RELATIVE_GAIN: f64 = 1e-12;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split (None = all)
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: Some(3),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl TreeParams {
    /// Check that the limits describe a growable tree
    pub fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(MathError::InvalidInput(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(MathError::InvalidInput(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(MathError::InvalidInput(
                "max_features must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree stored as a flat node arena (node 0 is the root)
#[derive(Debug, Clone)]
pub struct RegressionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    n_features: usize,
}

impl RegressionTree {
    /// Create an unfitted tree
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            n_features: 0,
        }
    }

    /// Grow the tree on the rows of `x` listed in `indices`, fitting `y`
    ///
    /// `y` is indexed by row of `x`, not by position in `indices`. The same
    /// row may appear several times in `indices` (bootstrap samples).
    pub fn fit_indices<R: Rng + ?Sized>(
        &mut self,
        x: ArrayView2<f64>,
        y: &[f64],
        indices: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        self.params.validate()?;
        if indices.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot grow a tree on zero samples".to_string(),
            ));
        }
        if y.len() != x.nrows() {
            return Err(MathError::InvalidInput(format!(
                "Target length {} does not match {} rows",
                y.len(),
                x.nrows()
            )));
        }

        self.n_features = x.ncols();
        self.nodes.clear();
        self.nodes.push(Node::Leaf { value: 0.0 });

        // Explicit stack: unlimited-depth trees on degenerate data would
        // otherwise recurse once per sample.
        let mut pending: Vec<(usize, Vec<usize>, usize)> = vec![(0, indices.to_vec(), 0)];

        while let Some((id, rows, depth)) = pending.pop() {
            let value = mean_of(y, &rows);
            self.nodes[id] = Node::Leaf { value };

            if !self.can_split(y, &rows, depth) {
                continue;
            }

            let split = match self.best_split(x, y, &rows, rng) {
                Some(split) => split,
                None => continue,
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            let left = self.nodes.len();
            self.nodes.push(Node::Leaf { value });
            let right = self.nodes.len();
            self.nodes.push(Node::Leaf { value });

            self.nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }

        Ok(())
    }

    fn can_split(&self, y: &[f64], rows: &[usize], depth: usize) -> bool {
        if rows.len() < self.params.min_samples_split
            || rows.len() < 2 * self.params.min_samples_leaf
        {
            return false;
        }
        if let Some(max_depth) = self.params.max_depth {
            if depth >= max_depth {
                return false;
            }
        }

        // Pure node
        let first = y[rows[0]];
        rows.iter().any(|&i| y[i] != first)
    }

    fn best_split<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<f64>,
        y: &[f64],
        rows: &[usize],
        rng: &mut R,
    ) -> Option<Split> {
        let n = rows.len();
        let total: f64 = rows.iter().map(|&i| y[i]).sum();
        let parent_score = total * total / n as f64;
        let tolerance = MIN_RELATIVE_GAIN * (1.0 + parent_score.abs());

        // With a feature budget, candidates are visited in random order and the
        // scan only stops once the budget is spent and a valid split exists
        let mut features: Vec<usize> = (0..self.n_features).collect();
        let budget = match self.params.max_features {
            Some(k) if k < features.len() => {
                features.shuffle(rng);
                k
            }
            _ => features.len(),
        };

        let min_leaf = self.params.min_samples_leaf;
        let mut order = rows.to_vec();
        let mut best: Option<Split> = None;

        for (tried, &feature) in features.iter().enumerate() {
            if tried >= budget && best.is_some() {
                break;
            }

            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += y[order[pos]];
                let left_n = pos + 1;
                let right_n = n - left_n;
                if right_n < min_leaf {
                    break;
                }
                if left_n < min_leaf {
                    continue;
                }

                let current = x[[order[pos], feature]];
                let next = x[[order[pos + 1], feature]];
                if current == next {
                    continue;
                }

                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
                let gain = score - parent_score;

                if gain > tolerance && best.map_or(true, |b| gain > b.gain) {
                    let mut threshold = current + (next - current) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict a single row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    /// Predict every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(MathError::NotFitted);
        }
        crate::regressor::validate_features(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    /// Whether the tree has been grown
    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match &self.nodes[id] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        deepest
    }
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64
}
