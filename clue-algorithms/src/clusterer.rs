//! Seed/follower/outlier classification and cluster propagation.
//!
//! A pass classifies every node once, then expands each seed through the
//! follower forest with an explicit stack. With reclustering enabled, the
//! pass restarts with a smaller seed separation whenever a cluster grows
//! past the energy ceiling.

use clue_core::{Hit, Point3, ReclusterConfig};

use crate::density::{energy_centroid, Density};

/// Classification thresholds of one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum energy for a seed (`rho_c`).
    pub seed_density: f64,
    /// Minimum separation for a seed (`delta_c`).
    pub seed_separation: f64,
    /// Minimum separation for an outlier (`delta_o`).
    pub outlier_separation: f64,
}

/// Role of a node within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Root of a new cluster.
    Seed,
    /// Attached to its nearest higher-energy node.
    Follower,
    /// Isolated low-energy node, left unclustered.
    Outlier,
}

impl Thresholds {
    /// Classifies a node given the seed separation in effect for it.
    pub fn classify(&self, energy: f64, separation: f64, seed_separation: f64) -> NodeRole {
        if energy > self.seed_density && separation > seed_separation {
            NodeRole::Seed
        } else if energy <= self.seed_density && separation > self.outlier_separation {
            NodeRole::Outlier
        } else {
            NodeRole::Follower
        }
    }
}

/// Hits gathered by one seed and its transitive followers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoCluster<H> {
    /// Node index of the seed.
    pub seed: usize,
    /// Accumulated energy.
    pub energy: f64,
    /// Accumulated hits, seed first.
    pub hits: Vec<H>,
}

/// Result of a clustering pass.
#[derive(Debug, Clone)]
pub struct PassOutcome<H> {
    /// Clusters in seed order.
    pub clusters: Vec<ProtoCluster<H>>,
    /// Nodes classified as outliers on the final iteration.
    pub outliers: usize,
    /// Energy of nodes left without a cluster.
    pub unclustered_energy: f64,
    /// Outer iterations run.
    pub loops: usize,
    /// Seeds found on the first iteration.
    pub initial_cluster_count: usize,
    /// Effective seed separation of each iteration.
    pub delta_c_history: Vec<f64>,
    /// False if a cluster still exceeds the energy ceiling after reclustering.
    pub converged: bool,
}

/// Reusable buffers for [`Clusterer::run`].
#[derive(Debug, Default)]
pub struct ClustererScratch {
    followers: Vec<Vec<usize>>,
    stack: Vec<usize>,
    overloaded: Vec<bool>,
}

impl ClustererScratch {
    fn prepare(&mut self, n: usize) {
        if self.followers.len() < n {
            self.followers.resize_with(n, Vec::new);
        }
        for followers in &mut self.followers[..n] {
            followers.clear();
        }
        self.stack.clear();
        self.overloaded.clear();
        self.overloaded.resize(n, false);
    }

    /// Releases every buffer.
    pub fn clear(&mut self) {
        self.followers.clear();
        self.stack.clear();
        self.overloaded.clear();
    }
}

/// Runs classification and propagation over a density arena.
#[derive(Debug, Clone, Copy)]
pub struct Clusterer<'r> {
    thresholds: Thresholds,
    recluster: Option<&'r ReclusterConfig>,
    debug: bool,
}

impl<'r> Clusterer<'r> {
    /// Creates a single-pass clusterer.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            recluster: None,
            debug: false,
        }
    }

    /// Enables energy-bounded reclustering.
    #[must_use]
    pub fn with_reclustering(mut self, recluster: &'r ReclusterConfig) -> Self {
        self.recluster = Some(recluster);
        self
    }

    /// Enables per-node debug traces.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Clusters `nodes`, which must be sorted by descending energy with
    /// `follower_of` links already set.
    ///
    /// On return every node's `cluster_id` reflects the accepted iteration.
    pub fn run<H: Hit + Clone>(
        &self,
        nodes: &mut [Density<H>],
        scratch: &mut ClustererScratch,
    ) -> PassOutcome<H> {
        let n = nodes.len();
        scratch.prepare(n);

        let event_centroid = energy_centroid(nodes.iter().flat_map(|node| node.hits.iter()));
        let base_separation = self.thresholds.seed_separation;
        let mut multiplier = 1.0_f64;
        let mut loops = 0usize;
        let mut initial_cluster_count = 0usize;
        let mut delta_c_history = Vec::new();

        loop {
            loops += 1;
            let shrunk_separation = base_separation * multiplier;
            delta_c_history.push(shrunk_separation);

            for followers in &mut scratch.followers[..n] {
                followers.clear();
            }
            scratch.stack.clear();

            let mut clusters: Vec<ProtoCluster<H>> = Vec::new();
            let mut outliers = 0usize;

            for i in 0..n {
                let shrink = loops > 1
                    && scratch.overloaded[i]
                    && self.near_axis(&nodes[i], &event_centroid);
                let seed_separation = if shrink {
                    shrunk_separation
                } else {
                    base_separation
                };
                let node = &mut nodes[i];
                node.cluster_id = None;
                let role = self
                    .thresholds
                    .classify(node.total_energy, node.separation, seed_separation);
                if self.debug {
                    log::debug!(
                        "node {i}: layer {} E={:.3} delta={} follower_of={:?} -> {role:?}",
                        node.layer,
                        node.total_energy,
                        node.separation,
                        node.follower_of
                    );
                }
                match role {
                    NodeRole::Seed => {
                        node.cluster_id = Some(clusters.len());
                        clusters.push(ProtoCluster {
                            seed: i,
                            energy: node.total_energy,
                            hits: node.hits.clone(),
                        });
                        scratch.stack.push(i);
                    }
                    NodeRole::Outlier => outliers += 1,
                    NodeRole::Follower => {
                        if let Some(parent) = node.follower_of {
                            scratch.followers[parent].push(i);
                        }
                    }
                }
            }

            if loops == 1 {
                initial_cluster_count = clusters.len();
            }

            let ceiling = self.recluster.and_then(|config| {
                let may_shrink =
                    loops < config.max_iterations && multiplier >= config.threshold_floor;
                may_shrink.then_some(config.max_cluster_energy)
            });

            let mut overloaded = None;
            'propagate: while let Some(parent) = scratch.stack.pop() {
                let Some(cluster_id) = nodes[parent].cluster_id else {
                    continue;
                };
                for &child in &scratch.followers[parent] {
                    let follower = &mut nodes[child];
                    follower.cluster_id = Some(cluster_id);
                    let cluster = &mut clusters[cluster_id];
                    cluster.energy += follower.total_energy;
                    cluster.hits.extend(follower.hits.iter().cloned());
                    scratch.stack.push(child);

                    if ceiling.is_some_and(|max| cluster.energy > max) {
                        overloaded = Some(cluster_id);
                        break 'propagate;
                    }
                }
            }

            if let Some(cluster_id) = overloaded {
                for (flag, node) in scratch.overloaded.iter_mut().zip(nodes.iter()) {
                    if node.cluster_id == Some(cluster_id) {
                        *flag = true;
                    }
                }
                if let Some(config) = self.recluster {
                    multiplier /= config.shrink_factor;
                }
                if self.debug {
                    log::debug!(
                        "cluster {cluster_id} above energy ceiling, seed separation now {}",
                        base_separation * multiplier
                    );
                }
                continue;
            }

            let unclustered_energy = nodes
                .iter()
                .filter(|node| node.cluster_id.is_none())
                .map(|node| node.total_energy)
                .sum();

            let converged = self.recluster.is_none_or(|config| {
                let heaviest = clusters.iter().map(|c| c.energy).fold(0.0, f64::max);
                let ok = heaviest <= config.max_cluster_energy;
                if !ok {
                    log::warn!(
                        "reclustering stopped after {loops} iterations (seed separation {:.4}) with a {heaviest:.1} MeV cluster above the {:.1} MeV ceiling",
                        shrunk_separation,
                        config.max_cluster_energy
                    );
                }
                ok
            });

            return PassOutcome {
                clusters,
                outliers,
                unclustered_energy,
                loops,
                initial_cluster_count,
                delta_c_history,
                converged,
            };
        }
    }

    fn near_axis<H>(&self, node: &Density<H>, event_centroid: &Point3) -> bool {
        self.recluster.is_some_and(|config| {
            node.position.planar_distance(event_centroid) < config.centroid_radius
        })
    }
}

/// Replaces each cluster's seed by a node describing the whole cluster.
///
/// The returned nodes are unlinked and sorted by descending energy; they are
/// the inputs of the cross-layer pass.
pub fn merge_into_seeds<H: Hit>(
    nodes: &[Density<H>],
    clusters: Vec<ProtoCluster<H>>,
) -> Vec<Density<H>> {
    let mut seeds: Vec<Density<H>> = clusters
        .into_iter()
        .map(|cluster| {
            let centroid = energy_centroid(&cluster.hits);
            let layer = nodes.get(cluster.seed).map_or(0, |seed| seed.layer);
            Density::new(centroid, cluster.energy, layer, cluster.hits)
        })
        .collect();
    seeds.sort_by(|a, b| b.total_energy.total_cmp(&a.total_energy));
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityGraphBuilder;
    use approx::assert_relative_eq;
    use clue_core::HitData;

    fn graph(hits: &[HitData], dm: f64) -> Vec<Density<HitData>> {
        let refs: Vec<&HitData> = hits.iter().collect();
        DensityGraphBuilder::new(0.0, dm).build(&refs, 0)
    }

    fn thresholds(rho_c: f64, delta_c: f64, delta_o: f64) -> Thresholds {
        Thresholds {
            seed_density: rho_c,
            seed_separation: delta_c,
            outlier_separation: delta_o,
        }
    }

    #[test]
    fn test_classify() {
        let t = thresholds(3.0, 2.0, 4.0);
        assert_eq!(t.classify(5.0, 3.0, 2.0), NodeRole::Seed);
        assert_eq!(t.classify(5.0, 1.0, 2.0), NodeRole::Follower);
        assert_eq!(t.classify(2.0, 5.0, 2.0), NodeRole::Outlier);
        assert_eq!(t.classify(3.0, 3.0, 2.0), NodeRole::Follower);
        assert_eq!(t.classify(5.0, 3.0, 4.0), NodeRole::Follower);
    }

    #[test]
    fn test_chain_propagates_to_seed() {
        // 10 <- 9 <- 8 <- 7 along a line, each 1 mm apart.
        let hits: Vec<HitData> = (0..4)
            .map(|i| HitData::new(i, f64::from(i), 0.0, 0.0, 10.0 - f64::from(i)))
            .collect();
        let mut nodes = graph(&hits, 1.5);
        let mut scratch = ClustererScratch::default();
        let outcome = Clusterer::new(thresholds(1.0, 1.5, 1.5)).run(&mut nodes, &mut scratch);

        assert_eq!(outcome.clusters.len(), 1);
        assert_eq!(outcome.clusters[0].hits.len(), 4);
        assert_relative_eq!(outcome.clusters[0].energy, 34.0);
        assert!(nodes.iter().all(|n| n.cluster_id == Some(0)));
        assert_eq!(outcome.loops, 1);
        assert!(outcome.converged);
    }

    #[test]
    fn test_outlier_and_its_followers_unclustered() {
        let hits = vec![
            HitData::new(1, 0.0, 0.0, 0.0, 10.0),
            HitData::new(2, 50.0, 0.0, 0.0, 2.0),
            HitData::new(3, 51.0, 0.0, 0.0, 1.0),
        ];
        let mut nodes = graph(&hits, 5.0);
        let mut scratch = ClustererScratch::default();
        let outcome = Clusterer::new(thresholds(3.0, 2.0, 5.0)).run(&mut nodes, &mut scratch);

        assert_eq!(outcome.clusters.len(), 1);
        assert_eq!(outcome.outliers, 1);
        assert_relative_eq!(outcome.unclustered_energy, 3.0);
        assert_relative_eq!(
            outcome.clusters[0].energy + outcome.unclustered_energy,
            13.0
        );
    }

    #[test]
    fn test_reclustering_splits_core() {
        // Two 60 MeV blobs 3 mm apart near the event axis; linked at delta_c = 4.
        let hits = vec![
            HitData::new(1, -1.5, 0.0, 0.0, 40.0),
            HitData::new(2, -1.5, 1.0, 0.0, 20.0),
            HitData::new(3, 1.5, 0.0, 0.0, 39.0),
            HitData::new(4, 1.5, 1.0, 0.0, 19.0),
        ];
        let config = ReclusterConfig {
            max_cluster_energy: 100.0,
            centroid_radius: 10.0,
            ..ReclusterConfig::default()
        };
        let mut nodes = graph(&hits, 4.0);
        let mut scratch = ClustererScratch::default();
        let outcome = Clusterer::new(thresholds(5.0, 4.0, 4.0))
            .with_reclustering(&config)
            .run(&mut nodes, &mut scratch);

        assert!(outcome.converged);
        assert!(outcome.loops > 1);
        assert_eq!(outcome.initial_cluster_count, 1);
        assert_eq!(outcome.clusters.len(), 2);
        assert!(outcome.clusters.iter().all(|c| c.energy <= 100.0));
        for pair in outcome.delta_c_history.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_merge_into_seeds() {
        let hits = vec![
            HitData::new(1, 0.0, 0.0, 4.0, 3.0),
            HitData::new(2, 4.0, 0.0, 4.0, 1.0),
            HitData::new(3, 90.0, 0.0, 4.0, 6.0),
        ];
        let mut nodes = graph(&hits, 5.0);
        for node in &mut nodes {
            node.layer = 2;
        }
        let mut scratch = ClustererScratch::default();
        let outcome = Clusterer::new(thresholds(0.5, 4.5, 5.0)).run(&mut nodes, &mut scratch);
        let seeds = merge_into_seeds(&nodes, outcome.clusters);

        assert_eq!(seeds.len(), 2);
        assert_relative_eq!(seeds[0].total_energy, 6.0);
        assert_relative_eq!(seeds[1].total_energy, 4.0);
        assert_relative_eq!(seeds[1].position.x, 1.0);
        assert_eq!(seeds[1].hits.len(), 2);
        assert!(seeds.iter().all(|s| s.layer == 2 && s.follower_of.is_none()));
    }
}
