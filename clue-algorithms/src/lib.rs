//! clue-algorithms: CLUE density-peak clustering for calorimeter showers.
//!
//! The engine is built from small stages:
//! - **layers** - z-ordered partition of an event into clustering layers
//! - **density** - spatial buckets linked to their nearest higher-energy neighbour
//! - **clusterer** - seed/follower/outlier classification, propagation and reclustering
//! - **linker** - cross-layer linking of 2D clusters
//! - **assembler** - output clusters with energy-weighted centroids
//!
#![warn(missing_docs)]

pub mod assembler;
mod clue;
pub mod clusterer;
pub mod density;
pub mod layers;
pub mod linker;
mod processing;

pub use assembler::{CentroidAccumulator, ClusterAssembler};
pub use clue::{ClueClustering, ClueState};
pub use clusterer::{Clusterer, ClustererScratch, NodeRole, PassOutcome, ProtoCluster, Thresholds};
pub use density::{Density, DensityGraphBuilder};
pub use layers::{Layer, LayerBuilder, LayerSet};
pub use linker::link_layers;
pub use processing::{cluster_event_stream, cluster_events, ClueOutput};

// Re-export core clustering traits
pub use clue_core::clustering::{ClusteringState, ClusteringStatistics, HitClustering};
