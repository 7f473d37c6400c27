// Tree-ensemble models exported from the training pipeline
use serde::Deserialize;

use super::error::InferenceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Nodes in array form, root at index 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point strictly forward, which guarantees every walk ends at a leaf.
    fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} but the model has {}",
                            i, feature, n_features
                        ));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {} has {} values, expected {}",
                            i,
                            value.len(),
                            leaf_width
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EnsembleHeader {
    n_features: usize,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl EnsembleHeader {
    fn check_input(&self, model: &'static str, columns: &[String], values: &[f64]) -> Result<(), InferenceError> {
        if values.len() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                model,
                expected: self.n_features,
                actual: values.len(),
            });
        }
        if let Some(expected) = &self.feature_names {
            if expected.as_slice() != columns {
                return Err(InferenceError::FeatureNames {
                    model,
                    expected: expected.clone(),
                    actual: columns.to_vec(),
                });
            }
        }
        Ok(())
    }
}

/// Averages per-tree class distributions and picks the most likely class.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawClassifier")]
pub struct ForestClassifier {
    header: EnsembleHeader,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct RawClassifier {
    #[serde(flatten)]
    header: EnsembleHeader,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RawClassifier> for ForestClassifier {
    type Error = String;

    fn try_from(raw: RawClassifier) -> Result<Self, Self::Error> {
        validate_ensemble(&raw.header, &raw.trees, raw.n_classes)?;
        if raw.n_classes == 0 {
            return Err("classifier has no classes".to_string());
        }
        Ok(Self {
            header: raw.header,
            n_classes: raw.n_classes,
            trees: raw.trees,
        })
    }
}

impl ForestClassifier {
    pub fn n_features(&self) -> usize {
        self.header.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn predict(&self, columns: &[String], values: &[f64]) -> Result<usize, InferenceError> {
        self.header.check_input("traffic level classifier", columns, values)?;

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf(values);
            let total: f64 = leaf.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, v) in proba.iter_mut().zip(leaf) {
                *p += v / total;
            }
        }

        // first maximum wins ties
        let mut best = 0;
        for (class, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }
}

/// Mean of the per-tree leaf values.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawRegressor")]
pub struct ForestRegressor {
    header: EnsembleHeader,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct RawRegressor {
    #[serde(flatten)]
    header: EnsembleHeader,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RawRegressor> for ForestRegressor {
    type Error = String;

    fn try_from(raw: RawRegressor) -> Result<Self, Self::Error> {
        validate_ensemble(&raw.header, &raw.trees, 1)?;
        Ok(Self {
            header: raw.header,
            trees: raw.trees,
        })
    }
}

impl ForestRegressor {
    pub fn n_features(&self) -> usize {
        self.header.n_features
    }

    pub fn predict(&self, columns: &[String], values: &[f64]) -> Result<f64, InferenceError> {
        self.header.check_input("vehicle count regressor", columns, values)?;

        let sum: f64 = self.trees.iter().map(|t| t.leaf(values)[0]).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

fn validate_ensemble(header: &EnsembleHeader, trees: &[DecisionTree], leaf_width: usize) -> Result<(), String> {
    if trees.is_empty() {
        return Err("ensemble has no trees".to_string());
    }
    if let Some(names) = &header.feature_names {
        if names.len() != header.n_features {
            return Err(format!(
                "{} feature names for {} features",
                names.len(),
                header.n_features
            ));
        }
    }
    for (i, tree) in trees.iter().enumerate() {
        tree.validate(header.n_features, leaf_width)
            .map_err(|e| format!("tree {}: {}", i, e))?;
    }
    Ok(())
}
