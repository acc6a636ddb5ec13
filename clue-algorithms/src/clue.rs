//! CLUE clustering entry point.
//!
//! Single-layer mode (`layer_count == 1`) runs one 2D pass over the whole
//! event, optionally with reclustering. Layered mode clusters every
//! clustering layer on its own, links the resulting 2D clusters across
//! neighbouring layers and clusters them once more.

use clue_core::{ClueConfig, Cluster, ClusteringState, ClusteringStatistics, Hit, HitClustering};

use crate::assembler::ClusterAssembler;
use crate::clusterer::{merge_into_seeds, Clusterer, ClustererScratch, PassOutcome, Thresholds};
use crate::density::{energy_centroid, Density, DensityGraphBuilder};
use crate::layers::{Layer, LayerBuilder};
use crate::linker::link_layers;

/// Reusable clustering state.
///
/// Holds scratch buffers and the statistics of the last call. A state is
/// owned by one caller at a time; node arenas never outlive a call.
#[derive(Debug, Default)]
pub struct ClueState {
    scratch: ClustererScratch,
    statistics: ClusteringStatistics,
}

impl ClueState {
    /// Statistics of the last clustering call.
    pub fn statistics(&self) -> &ClusteringStatistics {
        &self.statistics
    }
}

impl ClusteringState for ClueState {
    fn reset(&mut self) {
        self.scratch.clear();
        self.statistics = ClusteringStatistics::default();
    }
}

/// Per-call session: owns the node arenas built while clustering one event.
struct Session<'s, H> {
    config: &'s ClueConfig,
    scratch: &'s mut ClustererScratch,
    statistics: &'s mut ClusteringStatistics,
    layer_seeds: Vec<Vec<Density<H>>>,
}

impl<'s, H: Hit + Clone> Session<'s, H> {
    fn new(config: &'s ClueConfig, state: &'s mut ClueState) -> Self {
        Self {
            config,
            scratch: &mut state.scratch,
            statistics: &mut state.statistics,
            layer_seeds: Vec::new(),
        }
    }

    fn graph_builder(&self) -> DensityGraphBuilder {
        DensityGraphBuilder::new(self.config.bucket_side, self.config.max_link_distance())
            .with_debug(self.config.debug)
    }

    fn layer_thresholds(&self, layer: &Layer<'_, H>) -> Thresholds {
        Thresholds {
            seed_density: layer.seed_density,
            seed_separation: self.config.seed_separation,
            outlier_separation: self.config.outlier_separation,
        }
    }

    fn record(&mut self, outcome: &PassOutcome<H>) {
        self.statistics.outliers += outcome.outliers;
        self.statistics.unclustered_energy += outcome.unclustered_energy;
    }

    fn record_final(&mut self, outcome: &PassOutcome<H>) {
        self.record(outcome);
        self.statistics.recluster_loops = outcome.loops;
        self.statistics.initial_cluster_count = outcome.initial_cluster_count;
        self.statistics.delta_c_history.clone_from(&outcome.delta_c_history);
        self.statistics.converged = outcome.converged;
    }

    /// One 2D pass over all hits.
    fn cluster_single(&mut self, layer: &Layer<'_, H>) -> Vec<Vec<H>> {
        let mut nodes = self.graph_builder().build(&layer.hits, 0);
        self.statistics.density_nodes += nodes.len();

        let mut clusterer =
            Clusterer::new(self.layer_thresholds(layer)).with_debug(self.config.debug);
        if self.config.reclustering_active() {
            clusterer = clusterer.with_reclustering(&self.config.recluster);
        }
        let outcome = clusterer.run(&mut nodes, self.scratch);
        self.record_final(&outcome);
        outcome.clusters.into_iter().map(|c| c.hits).collect()
    }

    /// Clusters one layer and keeps its merged seeds for linking.
    fn cluster_layer(&mut self, index: usize, layer: &Layer<'_, H>) {
        let mut nodes = self.graph_builder().build(&layer.hits, index);
        self.statistics.density_nodes += nodes.len();

        let outcome = Clusterer::new(self.layer_thresholds(layer))
            .with_debug(self.config.debug)
            .run(&mut nodes, self.scratch);
        self.record(&outcome);
        if self.config.debug {
            log::debug!(
                "layer {index}: {} hits, {} nodes, {} clusters, rho_c={:.3}",
                layer.hits.len(),
                nodes.len(),
                outcome.clusters.len(),
                layer.seed_density
            );
        }
        self.layer_seeds.push(merge_into_seeds(&nodes, outcome.clusters));
    }

    /// Links the per-layer seeds and runs the cross-layer pass.
    fn cluster_linked(&mut self) -> Vec<Vec<H>> {
        let config = self.config;
        let linking = &config.linking;
        let layer_seeds = std::mem::take(&mut self.layer_seeds);
        let max_distance = linking.seed_separation.max(linking.outlier_separation);
        let mut nodes = link_layers(layer_seeds, max_distance, config.debug);

        let thresholds = Thresholds {
            seed_density: linking.seed_density,
            seed_separation: linking.seed_separation,
            outlier_separation: linking.outlier_separation,
        };
        let outcome = Clusterer::new(thresholds)
            .with_debug(config.debug)
            .run(&mut nodes, self.scratch);
        self.record_final(&outcome);
        outcome.clusters.into_iter().map(|c| c.hits).collect()
    }
}

/// CLUE density-peak clustering.
#[derive(Debug, Clone, Default)]
pub struct ClueClustering {
    config: ClueConfig,
}

impl ClueClustering {
    /// Create with custom configuration.
    pub fn new(config: ClueConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &ClueConfig {
        &self.config
    }

    /// Clusters `hits` with a throwaway state.
    pub fn cluster_hits<H: Hit + Clone>(
        &self,
        hits: &[H],
    ) -> (Vec<Cluster<H>>, ClusteringStatistics) {
        let mut state = self.create_state();
        let clusters = self.cluster(hits, &mut state);
        (clusters, state.statistics)
    }
}

impl HitClustering for ClueClustering {
    type State = ClueState;

    fn name(&self) -> &'static str {
        "CLUE"
    }

    fn create_state(&self) -> Self::State {
        ClueState::default()
    }

    fn cluster<H: Hit + Clone>(&self, hits: &[H], state: &mut Self::State) -> Vec<Cluster<H>> {
        state.reset();
        state.statistics.hits_processed = hits.len();
        state.statistics.converged = true;
        if hits.is_empty() {
            return Vec::new();
        }

        let layer_count = self.config.effective_layer_count();
        if layer_count != self.config.layer_count {
            log::debug!(
                "layer count {} clamped to {layer_count}",
                self.config.layer_count
            );
        }
        if self.config.reclustering && !self.config.reclustering_active() {
            log::warn!(
                "reclustering only runs with a single layer; ignored for {layer_count} layers"
            );
        }
        let layers = LayerBuilder::new(layer_count, &self.config.geometry, self.config.seed_density)
            .build(hits);
        let assembler = ClusterAssembler::new(layers.first_layer_boundary);
        let event_centroid = energy_centroid(hits);

        let mut session = Session::new(&self.config, state);
        session.statistics.layers_built = layers.len();
        let hit_lists = if layer_count == 1 {
            match layers.layers.first() {
                Some(layer) => session.cluster_single(layer),
                None => Vec::new(),
            }
        } else {
            for (index, layer) in layers.layers.iter().enumerate() {
                session.cluster_layer(index, layer);
            }
            session.cluster_linked()
        };

        let clusters = assembler.assemble(&hit_lists);
        session.statistics.clusters_found = clusters.len();
        session.statistics.centroid_distances = clusters
            .iter()
            .map(|c| c.centroid.planar_distance(&event_centroid))
            .collect();

        log::trace!(
            "clustered {} hits into {} clusters over {} layers",
            hits.len(),
            clusters.len(),
            layers.len()
        );
        clusters
    }

    fn statistics(&self, state: &Self::State) -> ClusteringStatistics {
        state.statistics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clue_core::{HitData, LayerGeometry};

    #[test]
    fn test_empty_input() {
        let algo = ClueClustering::default();
        let mut state = algo.create_state();
        let hits: Vec<HitData> = Vec::new();
        assert!(algo.cluster(&hits, &mut state).is_empty());
        let stats = algo.statistics(&state);
        assert_eq!(stats.hits_processed, 0);
        assert_eq!(stats.clusters_found, 0);
        assert!(stats.converged);
    }

    #[test]
    fn test_single_hit() {
        let algo = ClueClustering::new(ClueConfig::new().with_seed_density(0.5));
        let hits = vec![HitData::new(1, 3.0, 4.0, 5.0, 2.0)];
        let (clusters, stats) = algo.cluster_hits(&hits);
        assert_eq!(clusters.len(), 1);
        assert_relative_eq!(clusters[0].energy, 2.0);
        assert_relative_eq!(stats.centroid_distances[0], 0.0);
    }

    #[test]
    fn test_state_reuse_resets_statistics() {
        let algo = ClueClustering::new(ClueConfig::new().with_seed_density(0.5));
        let mut state = algo.create_state();
        let many: Vec<HitData> = (0..5)
            .map(|i| HitData::new(i, f64::from(i) * 100.0, 0.0, 0.0, 1.0))
            .collect();
        assert_eq!(algo.cluster(&many, &mut state).len(), 5);
        let one = vec![HitData::new(9, 0.0, 0.0, 0.0, 1.0)];
        assert_eq!(algo.cluster(&one, &mut state).len(), 1);
        assert_eq!(state.statistics().hits_processed, 1);
        assert_eq!(state.statistics().clusters_found, 1);
    }

    /// A narrow shower through four planes plus a distant deposit.
    fn four_plane_shower() -> Vec<HitData> {
        let mut hits = Vec::new();
        let mut id = 0;
        for (plane, scale) in [1.0, 1.5, 1.25, 0.75].into_iter().enumerate() {
            let z = plane as f64 * 10.0;
            for (dx, e) in [(0.0, 400.0), (1.0, 200.0), (-1.0, 150.0)] {
                hits.push(HitData::new(id, dx, 0.0, z, e * scale));
                id += 1;
            }
        }
        hits.push(HitData::new(id, 500.0, 0.0, 30.0, 50.0));
        hits
    }

    fn layered_config() -> ClueConfig {
        ClueConfig::new()
            .with_seed_separation(2.0)
            .with_outlier_separation(4.0)
            .with_layer_count(4)
            .with_geometry(LayerGeometry::uniform(4, 2.0, 1.0))
    }

    #[test]
    fn test_layered_mode_links_layers() {
        let hits = four_plane_shower();
        let (clusters, stats) = ClueClustering::new(layered_config()).cluster_hits(&hits);

        assert_eq!(stats.layers_built, 4);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 12);
        assert_relative_eq!(clusters[0].energy, 3375.0);
        // The isolated 50 MeV deposit is below its layer's rho_c and dropped.
        assert_relative_eq!(stats.unclustered_energy, 50.0);
        assert_eq!(clusters[0].first_layer.hits.len(), 3);
    }

    #[test]
    fn test_reclustering_ignored_in_layered_mode() {
        let hits = four_plane_shower();
        let config = layered_config()
            .with_reclustering(true)
            .with_max_cluster_energy(100.0);
        let (clusters, stats) = ClueClustering::new(config).cluster_hits(&hits);

        // Same result as without reclustering, despite the 3375 MeV cluster.
        assert_eq!(clusters.len(), 1);
        assert_relative_eq!(clusters[0].energy, 3375.0);
        assert_eq!(stats.recluster_loops, 1);
        assert!(stats.converged);
    }
}
