// Cluster-based branch sampling
//
// Next-level states are placed on a line by `evaluation × probability` and grouped with
// k-means++. Each group contributes representatives in proportion to its size, members
// nearest the centroid first.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::config::ClusteringConfig;
use crate::evaluate::Evaluator;
use crate::search::ExpandedState;
use crate::types::{Player, Position};

/// A state projected onto the clustering axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterPoint {
    pub value: f64,
    /// Position of the state in the enumeration order
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: f64,
    pub members: Vec<ClusterPoint>,
}

impl Cluster {
    /// Within-cluster sum of squared distances to the centroid
    pub fn wcss(&self) -> f64 {
        self.members
            .iter()
            .map(|p| (p.value - self.centroid).powi(2))
            .sum()
    }
}

/// Interchangeable clustering strategy
pub trait Clustering: Send + Sync {
    /// Groups points into at most `clusters_amount` non-empty clusters
    fn clusterize(&self, points: &[ClusterPoint], clusters_amount: usize) -> Vec<Cluster>;

    /// Indices of the chosen representatives, `min(amount, members)` in total
    fn pick_representatives(&self, clusters: &[Cluster], amount: usize) -> Vec<usize> {
        let shares = apportion(clusters, amount);
        clusters
            .iter()
            .zip(shares)
            .flat_map(|(cluster, share)| closest_to_centroid(cluster, share))
            .collect()
    }
}

/// Splits `amount` across clusters in proportion to their sizes
///
/// Largest-remainder apportionment: every cluster first gets the floor of its quota,
/// the seats left over go to the largest fractional parts (larger clusters, then
/// earlier ones, on ties). The shares always sum to `min(amount, total members)`.
pub fn apportion(clusters: &[Cluster], amount: usize) -> Vec<usize> {
    let sizes: Vec<usize> = clusters.iter().map(|c| c.members.len()).collect();
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }
    let amount = amount.min(total);

    let quotas: Vec<f64> = sizes
        .iter()
        .map(|size| *size as f64 * amount as f64 / total as f64)
        .collect();
    let mut shares: Vec<usize> = quotas
        .iter()
        .zip(&sizes)
        .map(|(quota, size)| (quota.floor() as usize).min(*size))
        .collect();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|a, b| {
        let ra = quotas[*a] - quotas[*a].floor();
        let rb = quotas[*b] - quotas[*b].floor();
        rb.total_cmp(&ra)
            .then(sizes[*b].cmp(&sizes[*a]))
            .then(a.cmp(b))
    });

    let mut left = amount - shares.iter().sum::<usize>();
    while left > 0 {
        let before = left;
        for &c in &order {
            if left == 0 {
                break;
            }
            if shares[c] < sizes[c] {
                shares[c] += 1;
                left -= 1;
            }
        }
        if left == before {
            break;
        }
    }
    shares
}

/// The first `amount` members of a cluster ordered by distance to its centroid
pub fn closest_to_centroid(cluster: &Cluster, amount: usize) -> Vec<usize> {
    let mut members = cluster.members.clone();
    members.sort_by(|a, b| {
        let da = (a.value - cluster.centroid).abs();
        let db = (b.value - cluster.centroid).abs();
        da.total_cmp(&db).then(a.index.cmp(&b.index))
    });
    members.into_iter().take(amount).map(|p| p.index).collect()
}

/// Seeded one-dimensional k-means++ with Lloyd refinement
#[derive(Debug, Clone)]
pub struct ValueClustering {
    max_iterations: usize,
    seed: u64,
}

impl ValueClustering {
    pub fn new(max_iterations: usize, seed: u64) -> Self {
        ValueClustering {
            max_iterations: max_iterations.max(1),
            seed,
        }
    }

    fn initial_centroids(values: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
        let mut centroids = vec![values[rng.random_range(0..values.len())]];
        while centroids.len() < k {
            let distances: Vec<f64> = values
                .iter()
                .map(|v| {
                    centroids
                        .iter()
                        .map(|c| (v - c).powi(2))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let total: f64 = distances.iter().sum();
            if total <= 0.0 {
                centroids.push(values[rng.random_range(0..values.len())]);
                continue;
            }
            let mut ticket = rng.random::<f64>() * total;
            let mut chosen = values.len() - 1;
            for (i, d) in distances.iter().enumerate() {
                if ticket < *d {
                    chosen = i;
                    break;
                }
                ticket -= d;
            }
            centroids.push(values[chosen]);
        }
        centroids
    }

    fn nearest(value: f64, centroids: &[f64]) -> usize {
        let mut best = 0;
        for (i, c) in centroids.iter().enumerate() {
            if (value - c).abs() < (value - centroids[best]).abs() {
                best = i;
            }
        }
        best
    }
}

impl Clustering for ValueClustering {
    fn clusterize(&self, points: &[ClusterPoint], clusters_amount: usize) -> Vec<Cluster> {
        if points.is_empty() {
            return Vec::new();
        }
        let k = clusters_amount.clamp(1, points.len());
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = Self::initial_centroids(&values, k, &mut rng);
        let mut assignment = vec![usize::MAX; values.len()];

        for _ in 0..self.max_iterations {
            let mut changed = false;
            for (i, v) in values.iter().enumerate() {
                let nearest = Self::nearest(*v, &centroids);
                if assignment[i] != nearest {
                    assignment[i] = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            for (c, centroid) in centroids.iter_mut().enumerate() {
                let (sum, count) = values
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .fold((0.0, 0usize), |(s, n), (v, _)| (s + v, n + 1));
                if count > 0 {
                    *centroid = sum / count as f64;
                }
            }

            // Re-seed empty clusters with the point farthest from its centroid
            for c in 0..centroids.len() {
                if assignment.iter().any(|a| *a == c) {
                    continue;
                }
                let farthest = (0..values.len()).max_by(|a, b| {
                    let da = (values[*a] - centroids[assignment[*a]]).abs();
                    let db = (values[*b] - centroids[assignment[*b]]).abs();
                    da.total_cmp(&db)
                });
                if let Some(i) = farthest {
                    centroids[c] = values[i];
                    assignment[i] = c;
                }
            }
        }

        centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| Cluster {
                centroid: *centroid,
                members: points
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .map(|(p, _)| *p)
                    .collect(),
            })
            .filter(|cluster| !cluster.members.is_empty())
            .collect()
    }
}

/// Applies cluster sampling to a node's next-level states
#[derive(Clone)]
pub struct ClusterSampler {
    clustering: Arc<dyn Clustering>,
    clusters_amount: usize,
    representatives: usize,
    min_states: usize,
}

impl ClusterSampler {
    pub fn new(clustering: Arc<dyn Clustering>, config: &ClusteringConfig) -> Self {
        ClusterSampler {
            clustering,
            clusters_amount: config.clusters_amount,
            representatives: config.representatives,
            min_states: config.min_states_for_clustering,
        }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(
            Arc::new(ValueClustering::new(config.max_iterations, config.seed)),
            config,
        )
    }

    /// Projects each state onto `evaluation × probability`
    pub fn points<P: Position>(
        states: &[ExpandedState<P>],
        evaluator: &dyn Evaluator<P>,
        perspective: Player,
    ) -> Vec<ClusterPoint> {
        states
            .iter()
            .enumerate()
            .map(|(index, state)| ClusterPoint {
                value: evaluator.evaluate(&state.position, perspective) * state.probability,
                index,
            })
            .collect()
    }

    /// Keeps the representatives in enumeration order
    ///
    /// Small state sets pass through untouched.
    pub fn sample<P: Position>(
        &self,
        states: Vec<ExpandedState<P>>,
        evaluator: &dyn Evaluator<P>,
        perspective: Player,
    ) -> Vec<ExpandedState<P>> {
        if states.len() < self.min_states {
            return states;
        }

        let points = Self::points(&states, evaluator, perspective);
        let clusters = self.clustering.clusterize(&points, self.clusters_amount);
        let mut keep = self
            .clustering
            .pick_representatives(&clusters, self.representatives);
        keep.sort_unstable();
        keep.dedup();

        debug!(
            "Clustered {} states into {} clusters, keeping {}",
            states.len(),
            clusters.len(),
            keep.len()
        );

        let mut keep = keep.into_iter().peekable();
        states
            .into_iter()
            .enumerate()
            .filter_map(|(i, state)| {
                if keep.peek() == Some(&i) {
                    keep.next();
                    Some(state)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Mean WCSS per cluster over many point sets
pub fn average_wcss(
    clustering: &dyn Clustering,
    point_sets: &[Vec<ClusterPoint>],
    clusters_amount: usize,
) -> f64 {
    if point_sets.is_empty() || clusters_amount == 0 {
        return 0.0;
    }
    let total: f64 = point_sets
        .iter()
        .flat_map(|points| clustering.clusterize(points, clusters_amount))
        .map(|cluster| cluster.wcss())
        .sum();
    total / (point_sets.len() * clusters_amount) as f64
}

/// Elbow of a `(clusters_amount, average WCSS)` curve: the point of largest curvature
pub fn suggest_clusters_amount(curve: &[(usize, f64)]) -> Option<usize> {
    if curve.len() < 3 {
        return curve.first().map(|(k, _)| *k);
    }
    (1..curve.len() - 1)
        .max_by(|a, b| {
            let bend = |i: usize| curve[i - 1].1 - 2.0 * curve[i].1 + curve[i + 1].1;
            bend(*a).total_cmp(&bend(*b))
        })
        .map(|i| curve[i].0)
}
