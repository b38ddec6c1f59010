//! Persisted estimators.
//!
//! An estimator either returns a full class distribution or only its best
//! class; callers receive that difference as an [`Estimate`] variant instead
//! of probing for a probability method at run time.

use serde::{Deserialize, Serialize};

use crate::error::{ClassificationError, ClassificationResult, ModelLoadError};

/// Estimator output over the estimator's own class list
#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    /// Probability per class, same order as `classes`
    Distribution(Vec<f64>),
    /// Index of the single best class
    Label(usize),
}

impl Estimate {
    /// Expand to a distribution; a bare label becomes one-hot
    pub fn into_distribution(self, n_classes: usize) -> Vec<f64> {
        match self {
            Estimate::Distribution(p) => p,
            Estimate::Label(best) => (0..n_classes)
                .map(|i| if i == best { 1.0 } else { 0.0 })
                .collect(),
        }
    }
}

/// Decision tree node, addressed by position in [`DecisionTree::nodes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample counts or weights at this leaf
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Normalized leaf distribution reached by `x`
    pub fn leaf_distribution(&self, x: &[f64]) -> ClassificationResult<Vec<f64>> {
        let mut node = 0;
        // Children always sit after their parent, so this bounds the walk
        for _ in 0..self.nodes.len() {
            match self.nodes.get(node) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).ok_or_else(|| {
                        ClassificationError::MalformedModel(format!(
                            "split on feature {} of {}",
                            feature,
                            x.len()
                        ))
                    })?;
                    node = if *value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 || !total.is_finite() {
                        return Err(ClassificationError::MalformedModel(
                            "leaf has no mass".to_string(),
                        ));
                    }
                    return Ok(value.iter().map(|v| v / total).collect());
                }
                None => {
                    return Err(ClassificationError::MalformedModel(format!(
                        "node {} out of range",
                        node
                    )))
                }
            }
        }
        Err(ClassificationError::MalformedModel(
            "tree walk did not reach a leaf".to_string(),
        ))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", i, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} values for {} classes",
                            i,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {} has invalid weights", i));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {} has no mass", i));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Averaged decision trees; provides a full distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn predict_proba(&self, x: &[f64]) -> ClassificationResult<Vec<f64>> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_distribution(x)?;
            if leaf.len() != proba.len() {
                return Err(ClassificationError::MalformedModel(format!(
                    "leaf has {} values for {} classes",
                    leaf.len(),
                    proba.len()
                )));
            }
            for (acc, p) in proba.iter_mut().zip(leaf) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(proba.into_iter().map(|p| p / n_trees).collect())
    }
}

/// Closest class centroid; provides only the best label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    pub classes: Vec<String>,
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn predict(&self, x: &[f64]) -> ClassificationResult<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, centroid) in self.centroids.iter().enumerate() {
            if centroid.len() != x.len() {
                return Err(ClassificationError::DimensionMismatch {
                    expected: centroid.len(),
                    actual: x.len(),
                });
            }
            let distance: f64 = centroid
                .iter()
                .zip(x)
                .map(|(c, v)| (c - v).powi(2))
                .sum::<f64>()
                .sqrt();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        best.map(|(i, _)| i)
            .ok_or_else(|| ClassificationError::MalformedModel("no centroids".to_string()))
    }
}

/// Estimator variants understood by the artifact loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    RandomForest(RandomForest),
    NearestCentroid(NearestCentroid),
}

impl Estimator {
    /// Native class labels, in output order
    pub fn classes(&self) -> &[String] {
        match self {
            Estimator::RandomForest(forest) => &forest.classes,
            Estimator::NearestCentroid(nc) => &nc.classes,
        }
    }

    pub fn provides_distribution(&self) -> bool {
        matches!(self, Estimator::RandomForest(_))
    }

    pub fn estimate(&self, x: &[f64]) -> ClassificationResult<Estimate> {
        match self {
            Estimator::RandomForest(forest) => forest.predict_proba(x).map(Estimate::Distribution),
            Estimator::NearestCentroid(nc) => nc.predict(x).map(Estimate::Label),
        }
    }

    /// Structural checks against the expected feature width
    pub fn validate(&self, n_features: usize) -> Result<(), ModelLoadError> {
        let invalid = ModelLoadError::InvalidModel;
        let classes = self.classes();
        if classes.is_empty() {
            return Err(invalid("estimator has no classes".to_string()));
        }
        if let Some(class) = first_duplicate(classes) {
            return Err(invalid(format!("class {} is listed twice", class)));
        }

        match self {
            Estimator::RandomForest(forest) => {
                if forest.trees.is_empty() {
                    return Err(invalid("forest has no trees".to_string()));
                }
                for (t, tree) in forest.trees.iter().enumerate() {
                    tree.validate(n_features, classes.len())
                        .map_err(|e| invalid(format!("tree {}: {}", t, e)))?;
                }
            }
            Estimator::NearestCentroid(nc) => {
                if nc.centroids.len() != classes.len() {
                    return Err(invalid(format!(
                        "{} centroids for {} classes",
                        nc.centroids.len(),
                        classes.len()
                    )));
                }
                for (i, centroid) in nc.centroids.iter().enumerate() {
                    if centroid.len() != n_features {
                        return Err(invalid(format!(
                            "centroid {} has {} features, expected {}",
                            i,
                            centroid.len(),
                            n_features
                        )));
                    }
                    if centroid.iter().any(|v| !v.is_finite()) {
                        return Err(invalid(format!("centroid {} is not finite", i)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// First entry that appears more than once
pub(crate) fn first_duplicate<S: AsRef<str>>(items: &[S]) -> Option<&str> {
    for (i, item) in items.iter().enumerate() {
        let item = item.as_ref();
        if items[..i].iter().any(|other| other.as_ref() == item) {
            return Some(item);
        }
    }
    None
}
