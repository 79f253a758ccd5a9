//! Regression models used for price inference
//!
//! The forecaster only needs a [`PriceRegressor`]: an ordered feature list
//! and a `predict` over a row in that order. [`TreeEnsemble`] evaluates a
//! gradient-boosted tree dump exported as JSON.

use crate::error::{ForecastError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::Path;

/// A trained model that maps an aligned feature row to a price
pub trait PriceRegressor: Debug + Send + Sync {
    /// Feature names in the order `predict` expects them
    fn feature_names(&self) -> &[String];

    /// Predict a price for one feature row
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Node of a JSON tree dump
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DumpNode {
    Split {
        nodeid: usize,
        split: String,
        split_condition: f64,
        yes: usize,
        no: usize,
        missing: Option<usize>,
        children: Vec<DumpNode>,
    },
    Leaf {
        nodeid: usize,
        leaf: f64,
    },
}

/// On-disk model bundle: feature list, base score and trees
#[derive(Debug, Deserialize)]
struct ModelBundle {
    feature_names: Vec<String>,
    #[serde(default)]
    base_score: f64,
    trees: Vec<DumpNode>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

/// One regression tree with nodes indexed by node id
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Tree {
    fn from_dump(root: &DumpNode, features: &HashMap<&str, usize>) -> Result<Self> {
        let mut parsed: Vec<(usize, Node)> = Vec::new();
        let mut stack = vec![root];

        while let Some(dump) = stack.pop() {
            let (id, node) = match dump {
                DumpNode::Leaf { nodeid, leaf } => (*nodeid, Node::Leaf(*leaf)),
                DumpNode::Split {
                    nodeid,
                    split,
                    split_condition,
                    yes,
                    no,
                    missing,
                    children,
                } => {
                    stack.extend(children.iter());
                    let feature = resolve_feature(split, features)?;
                    (
                        *nodeid,
                        Node::Split {
                            feature,
                            threshold: *split_condition,
                            yes: *yes,
                            no: *no,
                            missing: missing.unwrap_or(*yes),
                        },
                    )
                }
            };

            parsed.push((id, node));
        }

        // Node ids of a dump are dense, so each must be below the node count
        let count = parsed.len();
        let mut nodes: Vec<Option<Node>> = vec![None; count];
        for (id, node) in parsed {
            let slot = nodes.get_mut(id).ok_or_else(|| {
                ForecastError::ModelError(format!(
                    "Node id {} out of range for a tree of {} nodes",
                    id, count
                ))
            })?;
            if slot.is_some() {
                return Err(ForecastError::ModelError(format!(
                    "Duplicate node id {} in tree",
                    id
                )));
            }
            *slot = Some(node);
        }

        let tree = Self { nodes };
        tree.validate()?;
        Ok(tree)
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.nodes.first(), Some(Some(_))) {
            return Err(ForecastError::ModelError("Tree has no root node".to_string()));
        }

        for node in self.nodes.iter().flatten() {
            if let Node::Split { yes, no, missing, .. } = node {
                for child in [*yes, *no, *missing] {
                    if !matches!(self.nodes.get(child), Some(Some(_))) {
                        return Err(ForecastError::ModelError(format!(
                            "Split references unknown node {}",
                            child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        let mut node_idx = 0usize;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(node_idx).and_then(|n| n.as_ref()) {
                Some(Node::Leaf(value)) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(f64::NAN);
                    node_idx = if value.is_nan() {
                        *missing
                    } else if value < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
                None => {
                    return Err(ForecastError::InferenceError(format!(
                        "Tree walk reached missing node {}",
                        node_idx
                    )))
                }
            }
        }

        Err(ForecastError::InferenceError(
            "Tree walk did not terminate".to_string(),
        ))
    }
}

fn resolve_feature(split: &str, features: &HashMap<&str, usize>) -> Result<usize> {
    if let Some(idx) = features.get(split) {
        return Ok(*idx);
    }

    // Dumps made without feature names refer to columns as f0, f1, ...
    split
        .strip_prefix('f')
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|idx| *idx < features.len())
        .ok_or_else(|| {
            ForecastError::ModelError(format!("Split on unknown feature '{}'", split))
        })
}

/// Gradient-boosted regression trees: `base_score + sum(leaf values)`
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    name: String,
    feature_names: Vec<String>,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Load a model bundle from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let model = Self::from_json_str(&text)?;

        log::info!(
            "Loaded model '{}' from {} ({} trees, {} features)",
            model.name,
            path.display(),
            model.trees.len(),
            model.feature_names.len()
        );
        Ok(model)
    }

    /// Parse a model bundle from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let bundle: ModelBundle = serde_json::from_str(text)
            .map_err(|e| ForecastError::ModelError(format!("Invalid model bundle: {}", e)))?;

        if bundle.feature_names.is_empty() {
            return Err(ForecastError::ModelError(
                "Model bundle lists no features".to_string(),
            ));
        }
        if bundle.trees.is_empty() {
            return Err(ForecastError::ModelError(
                "Model bundle contains no trees".to_string(),
            ));
        }

        let index: HashMap<&str, usize> = bundle
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        if index.len() != bundle.feature_names.len() {
            return Err(ForecastError::ModelError(
                "Model bundle lists duplicate feature names".to_string(),
            ));
        }

        let trees = bundle
            .trees
            .iter()
            .map(|root| Tree::from_dump(root, &index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: bundle.name.unwrap_or_else(|| "tree ensemble".to_string()),
            feature_names: bundle.feature_names,
            base_score: bundle.base_score,
            trees,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl PriceRegressor for TreeEnsemble {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(ForecastError::InferenceError(format!(
                "Expected {} features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }

        let mut score = self.base_score;
        for tree in &self.trees {
            score += tree.predict(features)?;
        }

        if !score.is_finite() {
            return Err(ForecastError::InferenceError(format!(
                "Model produced a non-finite prediction ({})",
                score
            )));
        }
        Ok(score)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "name": "test model",
        "feature_names": ["avg_price_lag_1", "is_monsoon"],
        "base_score": 0.5,
        "trees": [
            {
                "nodeid": 0, "depth": 0, "split": "avg_price_lag_1", "split_condition": 50.0,
                "yes": 1, "no": 2, "missing": 2,
                "children": [
                    { "nodeid": 1, "leaf": 10.0 },
                    { "nodeid": 2, "leaf": 20.0 }
                ]
            },
            {
                "nodeid": 0, "split": "f1", "split_condition": 0.5,
                "yes": 1, "no": 2,
                "children": [
                    { "nodeid": 1, "leaf": 0.0 },
                    { "nodeid": 2, "leaf": 5.0 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_load_bundle() {
        let model = TreeEnsemble::from_json_str(BUNDLE).unwrap();
        assert_eq!(model.name(), "test model");
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.base_score(), 0.5);
        assert_eq!(model.feature_names(), &["avg_price_lag_1", "is_monsoon"]);
    }

    #[test]
    fn test_predict_paths() {
        let model = TreeEnsemble::from_json_str(BUNDLE).unwrap();
        assert_eq!(model.predict(&[40.0, 0.0]).unwrap(), 10.5);
        assert_eq!(model.predict(&[60.0, 0.0]).unwrap(), 20.5);
        assert_eq!(model.predict(&[60.0, 1.0]).unwrap(), 25.5);
    }

    #[test]
    fn test_missing_values_follow_missing_branch() {
        let model = TreeEnsemble::from_json_str(BUNDLE).unwrap();
        // tree 1 sends NaN to node 2, tree 2 defaults missing to "yes"
        assert_eq!(model.predict(&[f64::NAN, f64::NAN]).unwrap(), 20.5);
    }

    #[test]
    fn test_wrong_row_length() {
        let model = TreeEnsemble::from_json_str(BUNDLE).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ForecastError::InferenceError(_))
        ));
    }

    #[test]
    fn test_unknown_split_feature() {
        let text = r#"{
            "feature_names": ["a"],
            "trees": [{ "nodeid": 0, "split": "b", "split_condition": 1.0, "yes": 1, "no": 2,
                        "children": [{ "nodeid": 1, "leaf": 1.0 }, { "nodeid": 2, "leaf": 2.0 }] }]
        }"#;
        assert!(matches!(
            TreeEnsemble::from_json_str(text),
            Err(ForecastError::ModelError(_))
        ));
    }

    #[test]
    fn test_dangling_child() {
        let text = r#"{
            "feature_names": ["a"],
            "trees": [{ "nodeid": 0, "split": "a", "split_condition": 1.0, "yes": 1, "no": 7,
                        "children": [{ "nodeid": 1, "leaf": 1.0 }] }]
        }"#;
        assert!(TreeEnsemble::from_json_str(text).is_err());
    }

    #[test]
    fn test_out_of_range_node_ids() {
        for id in ["18446744073709551615", "1000000000000", "3"] {
            let text = format!(
                r#"{{
                    "feature_names": ["a"],
                    "trees": [{{ "nodeid": 0, "split": "a", "split_condition": 1.0, "yes": 1, "no": {id},
                                "children": [{{ "nodeid": 1, "leaf": 1.0 }}, {{ "nodeid": {id}, "leaf": 2.0 }}] }}]
                }}"#,
                id = id
            );
            assert!(matches!(
                TreeEnsemble::from_json_str(&text),
                Err(ForecastError::ModelError(_))
            ));
        }
    }

    #[test]
    fn test_duplicate_node_id() {
        let text = r#"{
            "feature_names": ["a"],
            "trees": [{ "nodeid": 0, "split": "a", "split_condition": 1.0, "yes": 1, "no": 1,
                        "children": [{ "nodeid": 1, "leaf": 1.0 }, { "nodeid": 1, "leaf": 2.0 }] }]
        }"#;
        assert!(matches!(
            TreeEnsemble::from_json_str(text),
            Err(ForecastError::ModelError(_))
        ));
    }

    #[test]
    fn test_empty_bundle_rejected() {
        assert!(TreeEnsemble::from_json_str(r#"{"feature_names": [], "trees": []}"#).is_err());
        assert!(TreeEnsemble::from_json_str("not json").is_err());
    }
}
