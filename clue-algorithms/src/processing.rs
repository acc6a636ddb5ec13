//! Helpers for clustering many events.

use rayon::prelude::*;

use clue_core::{ClueConfig, Cluster, ClusteringStatistics, Hit, HitClustering};

use crate::ClueClustering;

/// Clusters and statistics of one event.
#[derive(Debug, Clone)]
pub struct ClueOutput<H> {
    /// Output clusters.
    pub clusters: Vec<Cluster<H>>,
    /// Statistics of the clustering call.
    pub statistics: ClusteringStatistics,
}

/// Clusters independent events in parallel, preserving event order.
///
/// Every worker thread owns its own state; a single event is always
/// processed on one thread.
pub fn cluster_events<H>(events: &[Vec<H>], config: &ClueConfig) -> Vec<ClueOutput<H>>
where
    H: Hit + Clone,
{
    let algo = ClueClustering::new(config.clone());
    events
        .par_iter()
        .map_init(
            || algo.create_state(),
            |state, hits| {
                let clusters = algo.cluster(hits, state);
                ClueOutput {
                    clusters,
                    statistics: algo.statistics(state),
                }
            },
        )
        .collect()
}

/// Clusters events sequentially, reusing one state.
pub fn cluster_event_stream<H, I>(events: I, config: &ClueConfig) -> Vec<ClueOutput<H>>
where
    H: Hit + Clone,
    I: IntoIterator<Item = Vec<H>>,
{
    let algo = ClueClustering::new(config.clone());
    let mut state = algo.create_state();
    events
        .into_iter()
        .map(|hits| {
            let clusters = algo.cluster(&hits, &mut state);
            ClueOutput {
                clusters,
                statistics: algo.statistics(&state),
            }
        })
        .collect()
}
