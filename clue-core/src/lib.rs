//! clue-core: Core traits and types for calorimeter shower clustering.
//!
//! This crate provides the foundational abstractions shared by the CLUE
//! engine, its I/O layer and the command-line tool: calibrated hits,
//! output clusters, configuration and statistics.
//!

pub mod clustering;
pub mod config;
pub mod error;
pub mod hit;

pub use clustering::{
    Cluster, ClusteringState, ClusteringStatistics, FirstLayerCentroid, HitClustering,
};
pub use config::{ClueConfig, LayerGeometry, LinkingConfig, ReclusterConfig, DEFAULT_MAX_LAYERS};
pub use error::{Error, Result};
pub use hit::{Hit, HitData, Point3};
