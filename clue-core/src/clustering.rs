//! Clustering traits and types.

use crate::{Hit, HitData, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Energy-weighted centroid of the hits of a cluster that lie in the
/// first physical layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FirstLayerCentroid<H = HitData> {
    /// Summed energy of the first-layer hits.
    pub energy: f64,
    /// Energy-weighted centroid of the first-layer hits.
    pub centroid: Point3,
    /// First-layer hits, in cluster order.
    pub hits: Vec<H>,
}

/// A shower cluster produced by CLUE.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster<H = HitData> {
    /// Summed energy of all member hits.
    pub energy: f64,
    /// Energy-weighted centroid of all member hits.
    pub centroid: Point3,
    /// Hits belonging to this cluster.
    pub hits: Vec<H>,
    /// Sub-centroid restricted to the first physical layer.
    pub first_layer: FirstLayerCentroid<H>,
}

// Written out so the hit type itself need not implement `Default`.
impl<H> Default for FirstLayerCentroid<H> {
    fn default() -> Self {
        Self {
            energy: 0.0,
            centroid: Point3::default(),
            hits: Vec::new(),
        }
    }
}

impl<H> Default for Cluster<H> {
    fn default() -> Self {
        Self {
            energy: 0.0,
            centroid: Point3::default(),
            hits: Vec::new(),
            first_layer: FirstLayerCentroid::default(),
        }
    }
}

impl<H> Cluster<H> {
    /// Returns the number of hits in the cluster.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster is empty.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &H> {
        self.hits.iter()
    }
}

impl<H: Hit> Cluster<H> {
    /// Returns the identifiers of the member hits, in cluster order.
    pub fn hit_ids(&self) -> Vec<u32> {
        self.hits.iter().map(Hit::id).collect()
    }
}

/// Statistics about a clustering call.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringStatistics {
    /// Number of hits clustered.
    pub hits_processed: usize,
    /// Number of clustering layers built (1 in single-layer mode).
    pub layers_built: usize,
    /// Density nodes created across all 2D passes.
    pub density_nodes: usize,
    /// Number of clusters emitted.
    pub clusters_found: usize,
    /// Nodes classified as outliers, summed across all passes.
    pub outliers: usize,
    /// Energy of nodes left without a cluster, summed across all passes.
    pub unclustered_energy: f64,
    /// Outer reclustering iterations run (1 when nothing was split).
    pub recluster_loops: usize,
    /// Seeds found on the first reclustering iteration, before any shrink.
    pub initial_cluster_count: usize,
    /// False when reclustering stopped with a cluster above the energy ceiling.
    pub converged: bool,
    /// Effective seed separation used on each reclustering iteration.
    pub delta_c_history: Vec<f64>,
    /// Planar distance of every cluster centroid to the event centroid.
    pub centroid_distances: Vec<f64>,
}

/// Trait for clustering state.
pub trait ClusteringState: Send {
    /// Reset state for new data.
    fn reset(&mut self);
}

/// Trait for hit clustering algorithms.
pub trait HitClustering: Send + Sync {
    /// The state type used by this algorithm.
    type State: ClusteringState;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;

    /// Creates a fresh state object.
    fn create_state(&self) -> Self::State;

    /// Clusters one event worth of hits.
    ///
    /// Never fails: degenerate input yields degenerate output and the
    /// details are recorded in the state's statistics.
    fn cluster<H: Hit + Clone>(&self, hits: &[H], state: &mut Self::State) -> Vec<Cluster<H>>;

    /// Returns statistics about the last clustering call.
    fn statistics(&self, state: &Self::State) -> ClusteringStatistics;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_accessors() {
        let cluster = Cluster {
            energy: 30.0,
            centroid: Point3::new(0.5, 0.0, 0.0),
            hits: vec![
                HitData::new(4, 0.0, 0.0, 0.0, 10.0),
                HitData::new(9, 1.0, 0.0, 0.0, 20.0),
            ],
            first_layer: FirstLayerCentroid::default(),
        };

        assert_eq!(cluster.len(), 2);
        assert!(!cluster.is_empty());
        assert_eq!(cluster.hit_ids(), vec![4, 9]);
        assert_eq!(cluster.iter().count(), 2);
    }

    #[test]
    fn test_default_cluster_is_empty() {
        let cluster: Cluster = Cluster::default();
        assert!(cluster.is_empty());
        assert!(cluster.first_layer.hits.is_empty());
        assert_eq!(cluster.centroid, Point3::default());
    }

    #[test]
    fn test_statistics_default() {
        let stats = ClusteringStatistics::default();
        assert_eq!(stats.clusters_found, 0);
        assert!(!stats.converged);
        assert!(stats.delta_c_history.is_empty());
    }
}
