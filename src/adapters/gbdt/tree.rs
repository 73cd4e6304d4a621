//! Regression trees of a gradient-boosted ensemble.

use serde::{Deserialize, Serialize};

/// One node of a regression tree.
///
/// Split semantics: `row[feature] <= threshold` goes left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flat, index-linked regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Check that the tree is well formed for `n_features` inputs.
    ///
    /// Children must be in bounds and strictly after their parent, which
    /// rules out cycles and guarantees `eval` terminates.
    pub(crate) fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has non-finite value"));
                    }
                }
            }
        }

        Ok(())
    }

    /// Leaf value reached by `row`.
    ///
    /// Returns `None` only for trees that did not pass [`Tree::check`].
    #[must_use]
    pub fn eval(&self, row: &[f64]) -> Option<f64> {
        let mut idx = 0;
        loop {
            match *self.nodes.get(idx)? {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let next = if *row.get(feature)? <= threshold { left } else { right };
                    if next <= idx {
                        return None;
                    }
                    idx = next;
                }
                Node::Leaf { value } => return Some(value),
            }
        }
    }
}
