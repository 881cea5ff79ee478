//! Random forest classifier.
//!
//! An ensemble of CART trees grown on bootstrap samples, splitting on
//! weighted gini impurity with balanced class weights so the rarer draw
//! outcome is not swamped by home wins. Each node considers a random
//! subset of `floor(sqrt(n_features))` features. Trees are stored as flat
//! node arenas so the whole forest serialises as plain JSON.
//!
//! Everything random flows from one seed: the master RNG hands each tree
//! its own seed, so fitting the same data twice yields the same forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{MatchOutcome, PipelineError};

/// Below this, an impurity decrease is treated as no decrease.
const MIN_GAIN: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Weighted class distribution of the training rows that reached here.
    Leaf { distribution: Vec<f64> },
}

/// A fitted tree. The root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict_distribution(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural sanity check for trees read from disk.
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split { feature, left, right, .. } => {
                    if *feature >= n_features {
                        return Err(format!("node {i} splits on feature {feature} of {n_features}"));
                    }
                    // Children always follow their parent in the arena.
                    if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {i} has out-of-range children"));
                    }
                }
                Node::Leaf { distribution } if distribution.len() != n_classes => {
                    return Err(format!("leaf {i} has {} classes, expected {n_classes}", distribution.len()));
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

/// Grows one tree.
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    class_weights: &'a [f64],
    n_classes: usize,
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn class_totals(&self, samples: &[usize]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for &s in samples {
            totals[self.y[s]] += self.class_weights[self.y[s]];
        }
        totals
    }

    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let totals = self.class_totals(&samples);
        let weight: f64 = totals.iter().sum();
        let impurity = gini(&totals, weight);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { distribution: normalize(&totals, weight) });

        if depth >= self.max_depth || samples.len() < self.min_samples_split || impurity <= MIN_GAIN {
            return idx;
        }
        let Some(best) = self.best_split(&samples, &totals, weight) else {
            return idx;
        };
        if impurity - best.impurity <= MIN_GAIN {
            return idx;
        }

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.x[s][best.feature] <= best.threshold);
        self.importances[best.feature] += weight * (impurity - best.impurity);

        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    /// Lowest weighted child impurity over a random feature subset.
    fn best_split(&mut self, samples: &[usize], totals: &[f64], weight: f64) -> Option<BestSplit> {
        let n_features = self.x[samples[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);
        features.truncate(self.max_features);

        let mut best: Option<BestSplit> = None;
        let mut sorted = samples.to_vec();

        for &f in &features {
            sorted.sort_by(|&a, &b| self.x[a][f].total_cmp(&self.x[b][f]));
            let mut left = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;

            for pair in sorted.windows(2) {
                let (s, next) = (pair[0], pair[1]);
                let w = self.class_weights[self.y[s]];
                left[self.y[s]] += w;
                left_weight += w;

                let (v, v_next) = (self.x[s][f], self.x[next][f]);
                if v == v_next {
                    continue;
                }
                let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let right_weight = weight - left_weight;
                let child = (left_weight * gini(&left, left_weight) + right_weight * gini(&right, right_weight)) / weight;

                if best.as_ref().map_or(true, |b| child < b.impurity) {
                    best = Some(BestSplit {
                        feature: f,
                        threshold: (v + v_next) / 2.0,
                        impurity: child,
                    });
                }
            }
        }
        best
    }
}

fn gini(totals: &[f64], weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    1.0 - totals.iter().map(|t| (t / weight).powi(2)).sum::<f64>()
}

fn normalize(totals: &[f64], weight: f64) -> Vec<f64> {
    if weight <= 0.0 {
        return vec![1.0 / totals.len() as f64; totals.len()];
    }
    totals.iter().map(|t| t / weight).collect()
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Outcomes seen in training, ascending by label. Distributions are
    /// indexed in this order.
    classes: Vec<MatchOutcome>,
    n_features: usize,
    params: ForestParams,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[MatchOutcome], params: ForestParams) -> Result<Self, PipelineError> {
        if x.is_empty() {
            return Err(PipelineError::InsufficientData("no training rows".into()));
        }
        if x.len() != y.len() {
            return Err(PipelineError::DataIntegrity(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|r| r.len() != n_features) {
            return Err(PipelineError::DataIntegrity("feature rows have inconsistent width".into()));
        }
        if params.n_estimators == 0 || params.max_depth == 0 {
            return Err(PipelineError::InsufficientData(
                "n_estimators and max_depth must be at least 1".into(),
            ));
        }

        let mut classes: Vec<MatchOutcome> = y.to_vec();
        classes.sort();
        classes.dedup();
        let labels: Vec<usize> = y
            .iter()
            .map(|o| classes.binary_search(o).unwrap_or_default())
            .collect();

        // Balanced weights: n / (k * count_c).
        let mut counts = vec![0usize; classes.len()];
        for &l in &labels {
            counts[l] += 1;
        }
        let class_weights: Vec<f64> = counts
            .iter()
            .map(|&c| x.len() as f64 / (classes.len() as f64 * c as f64))
            .collect();

        let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);
        let mut master = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importance_sum = vec![0.0; n_features];
        let mut informative_trees = 0usize;

        for _ in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let bootstrap: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();

            let mut builder = TreeBuilder {
                x,
                y: &labels,
                class_weights: &class_weights,
                n_classes: classes.len(),
                max_depth: params.max_depth,
                min_samples_split: params.min_samples_split.max(2),
                max_features,
                rng,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.build(bootstrap, 0);

            let total: f64 = builder.importances.iter().sum();
            if total > 0.0 {
                informative_trees += 1;
                for (acc, v) in importance_sum.iter_mut().zip(&builder.importances) {
                    *acc += v / total;
                }
            }
            trees.push(DecisionTree { nodes: builder.nodes });
        }

        let feature_importances = if informative_trees > 0 {
            importance_sum.iter().map(|v| v / informative_trees as f64).collect()
        } else {
            vec![0.0; n_features]
        };

        debug!(
            trees = trees.len(),
            classes = classes.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "Forest fitted"
        );

        Ok(Self {
            classes,
            n_features,
            params,
            trees,
            feature_importances,
        })
    }

    /// Mean tree distribution, in `classes()` order.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if row.len() != self.n_features {
            return Err(PipelineError::Prediction(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (p, d) in proba.iter_mut().zip(tree.predict_distribution(row)) {
                *p += d;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Most likely outcome; ties go to the lower label.
    pub fn predict(&self, row: &[f64]) -> Result<MatchOutcome, PipelineError> {
        let proba = self.predict_proba(row)?;
        Ok(self.most_likely(&proba))
    }

    /// The class with the highest probability in `proba` (as returned by
    /// `predict_proba`).
    pub fn most_likely(&self, proba: &[f64]) -> MatchOutcome {
        self.classes[argmax(proba).min(self.classes.len().saturating_sub(1))]
    }

    pub fn classes(&self) -> &[MatchOutcome] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Mean decrease in impurity per feature, summing to 1 when any tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Structural check for a forest read from disk.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.trees.is_empty() || self.classes.is_empty() {
            return Err(PipelineError::Prediction("model has no trees or no classes".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| PipelineError::Prediction(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
