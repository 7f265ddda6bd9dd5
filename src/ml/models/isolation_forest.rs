//! Isolation Forest implementation
//!
//! Anomaly detection using isolation trees. Anomalies are easier to isolate
//! and thus have shorter path lengths in the trees.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AnomalyModel, ModelConfig};
use crate::ml::features::{FeatureVector, NUM_FEATURES};

/// Euler-Mascheroni constant
const EULER_GAMMA: f32 = 0.577_215_664_9;

/// Isolation Forest model for anomaly detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Individual isolation trees
    trees: Vec<IsolationTree>,
    /// Number of trees
    num_trees: usize,
    /// Configured sample size for each tree
    sample_size: usize,
    /// Sample size actually used (capped by the training set)
    effective_sample_size: usize,
    /// c(effective_sample_size), the path-length normalizer
    avg_path_length: f32,
    /// Whether the model is trained
    trained: bool,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

impl IsolationForest {
    /// Create a new Isolation Forest
    pub fn new(config: ModelConfig) -> Self {
        Self::with_params(config.num_trees, config.sample_size)
    }

    /// Create with custom parameters
    pub fn with_params(num_trees: usize, sample_size: usize) -> Self {
        Self {
            trees: Vec::new(),
            num_trees,
            sample_size,
            effective_sample_size: 0,
            avg_path_length: 0.0,
            trained: false,
        }
    }

    /// Average path length of an unsuccessful BST search over `n` points, c(n)
    pub(crate) fn average_path_length(n: usize) -> f32 {
        if n <= 1 {
            return 0.0;
        }
        let n = n as f32;
        2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
    }

    /// Build all trees from `data` using the supplied random source.
    ///
    /// Callers must not pass an empty slice; the lifecycle manager rejects
    /// empty training batches before any detector is fitted.
    pub fn fit_with_rng<R: Rng>(&mut self, data: &[FeatureVector], rng: &mut R) {
        debug_assert!(!data.is_empty(), "isolation forest fitted on empty data");
        if data.is_empty() {
            return;
        }

        self.effective_sample_size = self.sample_size.min(data.len()).max(1);
        self.avg_path_length = Self::average_path_length(self.effective_sample_size);
        let height_limit = (self.effective_sample_size as f32).log2().ceil() as usize;

        let mut indices: Vec<usize> = (0..data.len()).collect();
        self.trees = (0..self.num_trees)
            .map(|_| {
                indices.shuffle(rng);
                let sample: Vec<&[f32; NUM_FEATURES]> = indices[..self.effective_sample_size]
                    .iter()
                    .map(|&i| &data[i].features)
                    .collect();
                IsolationTree::build(&sample, height_limit, rng)
            })
            .collect();

        self.trained = true;
    }

    /// Score a single sample in [0, 1]
    fn score_sample(&self, sample: &[f32; NUM_FEATURES]) -> f32 {
        if self.trees.is_empty() || self.avg_path_length == 0.0 {
            return 0.5;
        }

        let total_path_length: f32 = self.trees.iter().map(|tree| tree.path_length(sample)).sum();
        let avg_path = total_path_length / self.trees.len() as f32;

        // Anomaly score: 2^(-avg_path / c(sample_size))
        2.0_f32.powf(-avg_path / self.avg_path_length)
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    pub fn effective_sample_size(&self) -> usize {
        self.effective_sample_size
    }
}

impl AnomalyModel for IsolationForest {
    fn score(&self, sample: &FeatureVector) -> f32 {
        self.score_sample(&sample.features)
    }

    fn name(&self) -> &str {
        "IsolationForest"
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

/// Node in an isolation tree. Children are indices into the tree's arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationNode {
    /// Internal node with split
    Internal {
        feature_idx: usize,
        split_value: f32,
        left: usize,
        right: usize,
    },
    /// Leaf node
    Leaf { size: usize, height: usize },
}

/// A single isolation tree stored as an arena; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    /// Build an isolation tree from samples
    fn build<R: Rng>(samples: &[&[f32; NUM_FEATURES]], height_limit: usize, rng: &mut R) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build_node(samples.to_vec(), 0, height_limit, rng);
        tree
    }

    /// Recursively build nodes; recursion depth is bounded by `height_limit`.
    /// Returns the index of the node just created.
    fn build_node<R: Rng>(
        &mut self,
        samples: Vec<&[f32; NUM_FEATURES]>,
        height: usize,
        height_limit: usize,
        rng: &mut R,
    ) -> usize {
        let idx = self.nodes.len();

        // Terminal conditions
        if height >= height_limit || samples.len() <= 1 {
            self.nodes.push(IsolationNode::Leaf {
                size: samples.len(),
                height,
            });
            return idx;
        }

        // Randomly select feature
        let feature_idx = rng.random_range(0..NUM_FEATURES);

        // Find min/max for selected feature
        let (min_val, max_val) = samples.iter().fold((f32::MAX, f32::MIN), |(lo, hi), s| {
            (lo.min(s[feature_idx]), hi.max(s[feature_idx]))
        });

        // If all values are the same, make a leaf
        if max_val <= min_val {
            self.nodes.push(IsolationNode::Leaf {
                size: samples.len(),
                height,
            });
            return idx;
        }

        // Reserve the slot so children land after their parent
        self.nodes.push(IsolationNode::Leaf { size: 0, height });

        let split_value = rng.random_range(min_val..max_val);
        let (left_samples, right_samples): (Vec<_>, Vec<_>) =
            samples.into_iter().partition(|s| s[feature_idx] < split_value);

        let left = self.build_node(left_samples, height + 1, height_limit, rng);
        let right = self.build_node(right_samples, height + 1, height_limit, rng);

        self.nodes[idx] = IsolationNode::Internal {
            feature_idx,
            split_value,
            left,
            right,
        };
        idx
    }

    /// Path length for a sample: internal steps plus the leaf-size correction
    fn path_length(&self, sample: &[f32; NUM_FEATURES]) -> f32 {
        let mut idx = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[idx] {
                IsolationNode::Leaf { size, .. } => {
                    return depth as f32 + IsolationForest::average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature_idx,
                    split_value,
                    left,
                    right,
                } => {
                    idx = if sample[*feature_idx] < *split_value {
                        *left
                    } else {
                        *right
                    };
                    depth += 1;
                }
            }
        }
    }

    pub fn nodes(&self) -> &[IsolationNode] {
        &self.nodes
    }

    /// Feature indices used by internal nodes
    pub fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter_map(|n| match n {
            IsolationNode::Internal { feature_idx, .. } => Some(*feature_idx),
            IsolationNode::Leaf { .. } => None,
        })
    }

    /// Deepest leaf height
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                IsolationNode::Leaf { height, .. } => Some(*height),
                IsolationNode::Internal { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{geo_outlier, geo_training_set, nominal_geo};

    fn make_features(values: [f32; NUM_FEATURES]) -> FeatureVector {
        FeatureVector::new(1, values)
    }

    #[test]
    fn test_isolation_forest_creation() {
        let forest = IsolationForest::default();
        assert!(!forest.is_trained());
        assert_eq!(forest.name(), "IsolationForest");
    }

    #[test]
    fn test_isolation_forest_training() {
        let mut forest = IsolationForest::with_params(10, 32);
        let data: Vec<FeatureVector> = (0..100)
            .map(|i| make_features([50.0 + (i as f32 % 10.0); NUM_FEATURES]))
            .collect();

        forest.fit_with_rng(&data, &mut StdRng::seed_from_u64(7));

        assert!(forest.is_trained());
        assert_eq!(forest.trees().len(), 10);
        assert_eq!(forest.effective_sample_size(), 32);
        // ceil(log2(32)) = 5
        assert!(forest.trees().iter().all(|t| t.depth() <= 5));
    }

    #[test]
    fn test_sample_size_capped_by_data() {
        let mut forest = IsolationForest::default();
        let data = geo_training_set();
        forest.fit_with_rng(&data, &mut StdRng::seed_from_u64(1));
        assert_eq!(forest.effective_sample_size(), 50);
        // ceil(log2(50)) = 6
        assert!(forest.trees().iter().all(|t| t.depth() <= 6));
    }

    #[test]
    fn test_scores_in_unit_range() {
        let mut forest = IsolationForest::with_params(50, 64);
        let data: Vec<FeatureVector> = (0..200)
            .map(|i| make_features([50.0 + (i as f32 % 21.0) - 10.0; NUM_FEATURES]))
            .collect();
        forest.fit_with_rng(&data, &mut StdRng::seed_from_u64(3));

        for v in [50.0, 40.0, 60.0, 500.0, -500.0] {
            let s = forest.score(&make_features([v; NUM_FEATURES]));
            assert!((0.0..=1.0).contains(&s), "score {} for {}", s, v);
        }
    }

    #[test]
    fn test_outlier_scores_higher() {
        let mut forest = IsolationForest::default();
        let mut data = geo_training_set();
        data.push(geo_outlier());
        forest.fit_with_rng(&data, &mut StdRng::seed_from_u64(42));

        let nominal = forest.score(&nominal_geo(60));
        let outlier = forest.score(&geo_outlier());
        assert!(outlier > nominal, "outlier {} <= nominal {}", outlier, nominal);
    }

    #[test]
    fn test_constant_feature_never_split() {
        let mut forest = IsolationForest::with_params(50, 64);
        let data: Vec<FeatureVector> = (0..100)
            .map(|i| {
                let mut f = nominal_geo(i).features;
                f[1] = 0.0005;
                make_features(f)
            })
            .collect();
        forest.fit_with_rng(&data, &mut StdRng::seed_from_u64(11));

        for tree in forest.trees() {
            assert!(tree.split_features().all(|f| f != 1));
        }
    }

    #[test]
    fn test_internal_nodes_have_two_children() {
        let mut forest = IsolationForest::with_params(5, 64);
        forest.fit_with_rng(&geo_training_set(), &mut StdRng::seed_from_u64(5));

        for tree in forest.trees() {
            let nodes = tree.nodes();
            for node in nodes {
                if let IsolationNode::Internal { left, right, .. } = node {
                    assert!(*left < nodes.len() && *right < nodes.len());
                    assert_ne!(left, right);
                }
            }
        }
    }

    #[test]
    fn test_single_point_forest() {
        let mut forest = IsolationForest::with_params(3, 256);
        forest.fit_with_rng(&[geo_outlier()], &mut StdRng::seed_from_u64(0));
        assert_eq!(forest.score(&geo_outlier()), 0.5);
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(IsolationForest::average_path_length(1), 0.0);
        // c(2) = 2 * gamma - 1
        let c2 = IsolationForest::average_path_length(2);
        assert!((c2 - (2.0 * EULER_GAMMA - 1.0)).abs() < 1e-6);

        let c_10 = IsolationForest::average_path_length(10);
        let c_100 = IsolationForest::average_path_length(100);
        assert!(c_100 > c_10, "c(100)={} should be > c(10)={}", c_100, c_10);
    }
}
