//! Binary decision trees as exported from a fitted tree ensemble.

use serde::{Deserialize, Serialize};

/// A single tree node. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Internal node: go `left` when `x[feature] <= threshold`, otherwise `right`.
    Split {
        /// Column index tested at this node.
        feature: usize,
        /// Split threshold.
        threshold: f64,
        /// Index of the left child.
        left: usize,
        /// Index of the right child.
        right: usize,
    },
    /// Terminal node carrying per-class weights (counts or fractions).
    Leaf {
        /// One weight per class.
        value: Vec<f64>,
    },
}

/// A fitted decision tree stored as a flat node array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Nodes in depth-first order.
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Check the tree can be traversed for any input of `n_features` columns.
    ///
    /// Children must point strictly forward, which rules out cycles and
    /// guarantees every descent ends at a leaf.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!(
                                "node {idx} has child {child} outside ({idx}, {})",
                                self.nodes.len()
                            ));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} class weights, model has {n_classes} classes",
                            value.len()
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(format!("leaf {idx} has a negative or non-finite weight"));
                    }
                    let total: f64 = value.iter().sum();
                    if !(total.is_finite() && total > 0.0) {
                        return Err(format!(
                            "leaf {idx} total weight {total} is not positive and finite"
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Descend to the leaf reached by `row` and return its class weights.
    ///
    /// The tree must have passed [`Tree::validate`].
    pub fn leaf_value(&self, row: &[f32]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if f64::from(row[*feature]) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { value } => return value,
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                let d = depths[idx] + 1;
                depths[*left] = d;
                depths[*right] = d;
                max = max.max(d);
            }
        }
        max
    }
}
