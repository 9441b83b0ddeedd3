//! Classification model artifact
//!
//! Supported model families:
//! - `logistic_regression` (one-vs-rest or multinomial scores, arg-max)
//! - `k_nearest_neighbors` (Euclidean distance, majority vote)
//! - `decision_tree` (flattened node array, root at index 0)
//!
//! Labels are strings; numeric class codes are stored in their string form.

use serde::{Deserialize, Serialize};

use super::artifact::ArtifactError;
use super::InferenceError;

/// Pre-trained classifier
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression {
        classes: Vec<String>,
        /// One row per class, or a single row for a binary model
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    KNearestNeighbors {
        classes: Vec<String>,
        k: usize,
        samples: Vec<Vec<f64>>,
        /// Class index of each sample
        targets: Vec<usize>,
    },
    DecisionTree {
        classes: Vec<String>,
        nodes: Vec<TreeNode>,
    },
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` continues at `left`, otherwise at `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

impl Classifier {
    pub fn classes(&self) -> &[String] {
        match self {
            Self::LogisticRegression { classes, .. }
            | Self::KNearestNeighbors { classes, .. }
            | Self::DecisionTree { classes, .. } => classes,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::KNearestNeighbors { .. } => "k_nearest_neighbors",
            Self::DecisionTree { .. } => "decision_tree",
        }
    }

    /// Check the structure of a freshly loaded model
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let n_classes = self.classes().len();
        if n_classes == 0 {
            return Err(ArtifactError::invalid("model", "no classes declared"));
        }

        match self {
            Self::LogisticRegression {
                coefficients,
                intercepts,
                ..
            } => {
                let binary = n_classes == 2 && coefficients.len() == 1;
                if coefficients.len() != n_classes && !binary {
                    return Err(ArtifactError::invalid(
                        "model",
                        format!(
                            "{} coefficient rows for {n_classes} classes",
                            coefficients.len()
                        ),
                    ));
                }
                if intercepts.len() != coefficients.len() {
                    return Err(ArtifactError::invalid(
                        "model",
                        format!(
                            "{} intercepts for {} coefficient rows",
                            intercepts.len(),
                            coefficients.len()
                        ),
                    ));
                }
                let all_finite = coefficients
                    .iter()
                    .flatten()
                    .chain(intercepts)
                    .all(|v| v.is_finite());
                if !all_finite {
                    return Err(ArtifactError::invalid(
                        "model",
                        "coefficients contain non-finite values",
                    ));
                }
            }
            Self::KNearestNeighbors {
                k,
                samples,
                targets,
                ..
            } => {
                if *k == 0 {
                    return Err(ArtifactError::invalid("model", "k must be at least 1"));
                }
                if samples.is_empty() {
                    return Err(ArtifactError::invalid("model", "no reference samples"));
                }
                if samples.len() != targets.len() {
                    return Err(ArtifactError::invalid(
                        "model",
                        format!("{} samples but {} targets", samples.len(), targets.len()),
                    ));
                }
                if let Some(t) = targets.iter().find(|t| **t >= n_classes) {
                    return Err(ArtifactError::invalid(
                        "model",
                        format!("target {t} is not a class index"),
                    ));
                }
            }
            Self::DecisionTree { nodes, .. } => validate_tree(nodes, n_classes)?,
        }

        Ok(())
    }

    /// Check that the model reads exactly `n_features` inputs
    pub fn check_features(&self, n_features: usize) -> Result<(), ArtifactError> {
        let mismatch = |reason: String| ArtifactError::ShapeMismatch {
            features: n_features,
            reason,
        };

        match self {
            Self::LogisticRegression { coefficients, .. } => {
                if let Some(row) = coefficients.iter().find(|r| r.len() != n_features) {
                    return Err(mismatch(format!("coefficient row has {} weights", row.len())));
                }
            }
            Self::KNearestNeighbors { samples, .. } => {
                if let Some(row) = samples.iter().find(|r| r.len() != n_features) {
                    return Err(mismatch(format!("reference sample has {} values", row.len())));
                }
            }
            Self::DecisionTree { nodes, .. } => {
                let out_of_range = nodes.iter().find_map(|node| match node {
                    TreeNode::Split { feature, .. } if *feature >= n_features => Some(*feature),
                    _ => None,
                });
                if let Some(feature) = out_of_range {
                    return Err(mismatch(format!("split on feature index {feature}")));
                }
            }
        }

        Ok(())
    }

    /// Predict the label of one scaled row
    pub fn predict(&self, x: &[f64]) -> Result<&str, InferenceError> {
        let index = match self {
            Self::LogisticRegression {
                coefficients,
                intercepts,
                ..
            } => {
                ensure_width(coefficients.first().map_or(0, Vec::len), x)?;
                predict_linear(coefficients, intercepts, x)?
            }
            Self::KNearestNeighbors {
                classes,
                k,
                samples,
                targets,
            } => {
                ensure_width(samples.first().map_or(0, Vec::len), x)?;
                predict_neighbors(classes.len(), *k, samples, targets, x)
            }
            Self::DecisionTree { nodes, .. } => predict_tree(nodes, x)?,
        };

        self.classes()
            .get(index)
            .map(String::as_str)
            .ok_or(InferenceError::DimensionMismatch {
                expected: self.classes().len(),
                actual: index,
            })
    }
}

fn ensure_width(expected: usize, x: &[f64]) -> Result<(), InferenceError> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(InferenceError::DimensionMismatch {
            expected,
            actual: x.len(),
        })
    }
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).map(|(w, v)| w * v).sum()
}

fn predict_linear(
    coefficients: &[Vec<f64>],
    intercepts: &[f64],
    x: &[f64],
) -> Result<usize, InferenceError> {
    let scores: Vec<f64> = coefficients
        .iter()
        .zip(intercepts)
        .map(|(row, b)| dot(row, x) + b)
        .collect();
    // NaN never wins a comparison and would silently pick class 0
    if scores.iter().any(|s| s.is_nan()) {
        return Err(InferenceError::NonFiniteScore);
    }

    // Binary models carry a single decision function for the positive class
    if let [score] = scores.as_slice() {
        return Ok(usize::from(*score > 0.0));
    }

    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, score) in scores.into_iter().enumerate() {
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    Ok(best)
}

fn predict_neighbors(
    n_classes: usize,
    k: usize,
    samples: &[Vec<f64>],
    targets: &[usize],
    x: &[f64],
) -> usize {
    let mut distances: Vec<(f64, usize)> = samples
        .iter()
        .zip(targets)
        .map(|(sample, target)| {
            let d: f64 = sample.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum();
            (d, *target)
        })
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0));

    let neighbors = &distances[..k.min(distances.len())];
    let mut votes = vec![0usize; n_classes];
    for (_, target) in neighbors {
        votes[*target] += 1;
    }

    let top = votes.iter().copied().max().unwrap_or(0);
    // Ties go to the class of the nearest neighbor among the tied classes
    neighbors
        .iter()
        .map(|(_, target)| *target)
        .find(|target| votes[*target] == top)
        .unwrap_or(0)
}

fn predict_tree(nodes: &[TreeNode], x: &[f64]) -> Result<usize, InferenceError> {
    let mut index = 0;
    // validate_tree guarantees every path from the root ends in a leaf
    for _ in 0..=nodes.len() {
        match nodes.get(index) {
            Some(TreeNode::Leaf { class }) => return Ok(*class),
            Some(TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            }) => {
                let value = x.get(*feature).ok_or(InferenceError::DimensionMismatch {
                    expected: feature + 1,
                    actual: x.len(),
                })?;
                index = if *value <= *threshold { *left } else { *right };
            }
            None => break,
        }
    }

    Err(InferenceError::DimensionMismatch {
        expected: nodes.len(),
        actual: index,
    })
}

fn validate_tree(nodes: &[TreeNode], n_classes: usize) -> Result<(), ArtifactError> {
    if nodes.is_empty() {
        return Err(ArtifactError::invalid("model", "decision tree has no nodes"));
    }

    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        let Some(node) = nodes.get(index) else {
            return Err(ArtifactError::invalid(
                "model",
                format!("tree node index {index} out of range"),
            ));
        };
        if std::mem::replace(&mut visited[index], true) {
            return Err(ArtifactError::invalid(
                "model",
                format!("tree node {index} is reachable twice"),
            ));
        }
        match node {
            TreeNode::Leaf { class } if *class >= n_classes => {
                return Err(ArtifactError::invalid(
                    "model",
                    format!("leaf class {class} is not a class index"),
                ));
            }
            TreeNode::Leaf { .. } => {}
            TreeNode::Split {
                threshold,
                left,
                right,
                ..
            } => {
                if threshold.is_nan() {
                    return Err(ArtifactError::invalid("model", "split threshold is NaN"));
                }
                stack.push(*right);
                stack.push(*left);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn tree() -> Classifier {
        Classifier::DecisionTree {
            classes: labels(&["small", "medium", "large"]),
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { class: 0 },
                TreeNode::Split {
                    feature: 1,
                    threshold: 5.0,
                    left: 3,
                    right: 4,
                },
                TreeNode::Leaf { class: 1 },
                TreeNode::Leaf { class: 2 },
            ],
        }
    }

    #[test]
    fn test_logistic_regression_argmax() {
        let model = Classifier::LogisticRegression {
            classes: labels(&["a", "b", "c"]),
            coefficients: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            intercepts: vec![0.0, 0.0, 0.5],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[2.0, 1.0]).unwrap(), "a");
        assert_eq!(model.predict(&[1.0, 2.0]).unwrap(), "b");
        assert_eq!(model.predict(&[-1.0, -1.0]).unwrap(), "c");
    }

    #[test]
    fn test_logistic_regression_binary() {
        let model = Classifier::LogisticRegression {
            classes: labels(&["0", "1"]),
            coefficients: vec![vec![2.0]],
            intercepts: vec![-1.0],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[0.0]).unwrap(), "0");
        assert_eq!(model.predict(&[1.0]).unwrap(), "1");
    }

    #[test]
    fn test_logistic_regression_nan_score() {
        let model = Classifier::LogisticRegression {
            classes: labels(&["a", "b"]),
            coefficients: vec![vec![10.0, 10.0], vec![-1.0, 0.0]],
            intercepts: vec![0.0, 0.0],
        };
        // inf + -inf in the first row
        assert_eq!(
            model.predict(&[1e308, -1e308]),
            Err(InferenceError::NonFiniteScore)
        );
    }

    #[test]
    fn test_logistic_regression_wrong_width() {
        let model = Classifier::LogisticRegression {
            classes: labels(&["a", "b"]),
            coefficients: vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            intercepts: vec![0.0, 0.0],
        };
        assert!(matches!(
            model.predict(&[1.0]),
            Err(InferenceError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_knn_majority_vote() {
        let model = Classifier::KNearestNeighbors {
            classes: labels(&["red", "blue"]),
            k: 3,
            samples: vec![vec![0.0], vec![0.5], vec![1.0], vec![10.0], vec![11.0]],
            targets: vec![0, 1, 0, 1, 1],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[0.2]).unwrap(), "red");
        assert_eq!(model.predict(&[10.5]).unwrap(), "blue");
    }

    #[test]
    fn test_knn_tie_goes_to_nearest() {
        let model = Classifier::KNearestNeighbors {
            classes: labels(&["red", "blue"]),
            k: 2,
            samples: vec![vec![0.0], vec![1.0]],
            targets: vec![0, 1],
        };
        assert_eq!(model.predict(&[0.9]).unwrap(), "blue");
        assert_eq!(model.predict(&[0.1]).unwrap(), "red");
    }

    #[test]
    fn test_knn_validation() {
        let zero_k = Classifier::KNearestNeighbors {
            classes: labels(&["a"]),
            k: 0,
            samples: vec![vec![0.0]],
            targets: vec![0],
        };
        assert!(zero_k.validate().is_err());

        let bad_target = Classifier::KNearestNeighbors {
            classes: labels(&["a"]),
            k: 1,
            samples: vec![vec![0.0]],
            targets: vec![3],
        };
        assert!(bad_target.validate().is_err());
    }

    #[test]
    fn test_decision_tree_walk() {
        let model = tree();
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[0.5, 100.0]).unwrap(), "small");
        assert_eq!(model.predict(&[1.0, 100.0]).unwrap(), "small");
        assert_eq!(model.predict(&[2.0, 5.0]).unwrap(), "medium");
        assert_eq!(model.predict(&[2.0, 6.0]).unwrap(), "large");
    }

    #[test]
    fn test_decision_tree_rejects_cycle() {
        let model = Classifier::DecisionTree {
            classes: labels(&["a"]),
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
        };
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("reachable twice"));
    }

    #[test]
    fn test_decision_tree_rejects_dangling_child() {
        let model = Classifier::DecisionTree {
            classes: labels(&["a"]),
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 7,
                },
                TreeNode::Leaf { class: 0 },
            ],
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_check_features() {
        assert!(tree().check_features(2).is_ok());
        assert!(matches!(
            tree().check_features(1),
            Err(ArtifactError::ShapeMismatch { features: 1, .. })
        ));
    }

    #[test]
    fn test_deserialize_tree() {
        let json = r#"{
            "type": "decision_tree",
            "classes": ["no", "yes"],
            "nodes": [
                {"split": {"feature": 0, "threshold": 0.5, "left": 1, "right": 2}},
                {"leaf": {"class": 0}},
                {"leaf": {"class": 1}}
            ]
        }"#;
        let model: Classifier = serde_json::from_str(json).unwrap();
        assert_eq!(model.kind(), "decision_tree");
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[0.7]).unwrap(), "yes");
    }
}
