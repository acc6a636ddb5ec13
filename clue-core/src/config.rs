//! Configuration for CLUE clustering.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of sampling layers in the default geometry.
pub const DEFAULT_MAX_LAYERS: usize = 34;

/// Physical layer layout used to keep clustering layers aligned with
/// detector planes.
///
/// Only the z-extent of each physical layer matters: a new physical layer
/// starts with the first hit beyond `start_z + thickness + air_gap`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayerGeometry {
    /// Thickness of each physical layer along z (mm).
    pub thicknesses: Vec<f64>,
    /// Gap between consecutive physical layers (mm).
    pub air_gap: f64,
}

impl Default for LayerGeometry {
    /// Every distinct z plane is its own physical layer.
    fn default() -> Self {
        Self::uniform(DEFAULT_MAX_LAYERS, 0.0, 0.0)
    }
}

impl LayerGeometry {
    /// Creates a geometry of `count` identical layers.
    #[must_use]
    pub fn uniform(count: usize, thickness: f64, air_gap: f64) -> Self {
        Self {
            thicknesses: vec![thickness; count],
            air_gap,
        }
    }

    /// Maximum number of clustering layers this geometry supports.
    #[must_use]
    pub fn max_layers(&self) -> usize {
        self.thicknesses.len().max(1)
    }

    /// Thickness of physical layer `index`, reusing the last entry past the end.
    #[must_use]
    pub fn thickness(&self, index: usize) -> f64 {
        self.thicknesses
            .get(index)
            .or_else(|| self.thicknesses.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Z extent from the start of physical layer `index` to the start of the next one.
    #[must_use]
    pub fn pitch(&self, index: usize) -> f64 {
        self.thickness(index) + self.air_gap
    }
}

/// Energy-bounded reclustering parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReclusterConfig {
    /// Clusters above this energy trigger a threshold shrink (MeV).
    pub max_cluster_energy: f64,
    /// Planar radius around the event centroid where the shrunk threshold applies (mm).
    pub centroid_radius: f64,
    /// Divisor applied to the seed separation multiplier on every shrink.
    pub shrink_factor: f64,
    /// Shrinking stops once the multiplier drops below this value.
    pub threshold_floor: f64,
    /// Hard cap on outer classify+propagate iterations.
    pub max_iterations: usize,
}

impl Default for ReclusterConfig {
    fn default() -> Self {
        Self {
            max_cluster_energy: 5000.0,
            centroid_radius: 5.0,
            shrink_factor: 1.1,
            threshold_floor: 0.5,
            max_iterations: 100,
        }
    }
}

/// Thresholds for the cross-layer (3D) pass.
///
/// The defaults are the reference values and have not been calibrated;
/// override them for a given dataset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkingConfig {
    /// Minimum separation for a 2D cluster to seed a 3D cluster (mm).
    pub seed_separation: f64,
    /// Minimum separation for a low-energy 2D cluster to be dropped (mm).
    pub outlier_separation: f64,
    /// Minimum energy for a 2D cluster to seed a 3D cluster (MeV).
    pub seed_density: f64,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            seed_separation: 100.0,
            outlier_separation: 200.0,
            seed_density: 1000.0,
        }
    }
}

/// Configuration for CLUE clustering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClueConfig {
    /// Side length of the spatial buckets (mm); 0 collapses only identical positions.
    pub bucket_side: f64,
    /// Seed density threshold used in single-layer mode (MeV).
    pub seed_density: f64,
    /// Minimum separation for a node to become a seed (mm).
    pub seed_separation: f64,
    /// Minimum separation for a low-energy node to become an outlier (mm).
    pub outlier_separation: f64,
    /// Number of clustering layers; 1 disables the layered/3D mode.
    pub layer_count: usize,
    /// Enables the energy-bounded reclustering loop.
    pub reclustering: bool,
    /// Emits per-node debug traces through `log`.
    pub debug: bool,
    /// Reclustering parameters.
    pub recluster: ReclusterConfig,
    /// Cross-layer pass parameters.
    pub linking: LinkingConfig,
    /// Physical layer layout.
    pub geometry: LayerGeometry,
}

impl Default for ClueConfig {
    fn default() -> Self {
        Self {
            bucket_side: 0.0,
            seed_density: 550.0,
            seed_separation: 10.0,
            outlier_separation: 40.0,
            layer_count: 1,
            reclustering: false,
            debug: false,
            recluster: ReclusterConfig::default(),
            linking: LinkingConfig::default(),
            geometry: LayerGeometry::default(),
        }
    }
}

impl ClueConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bucket side length.
    #[must_use]
    pub fn with_bucket_side(mut self, dc: f64) -> Self {
        self.bucket_side = dc;
        self
    }

    /// Sets the single-layer seed density threshold.
    #[must_use]
    pub fn with_seed_density(mut self, rc: f64) -> Self {
        self.seed_density = rc;
        self
    }

    /// Sets the seed separation threshold.
    #[must_use]
    pub fn with_seed_separation(mut self, deltac: f64) -> Self {
        self.seed_separation = deltac;
        self
    }

    /// Sets the outlier separation threshold.
    #[must_use]
    pub fn with_outlier_separation(mut self, deltao: f64) -> Self {
        self.outlier_separation = deltao;
        self
    }

    /// Sets the number of clustering layers.
    #[must_use]
    pub fn with_layer_count(mut self, count: usize) -> Self {
        self.layer_count = count;
        self
    }

    /// Enables or disables reclustering.
    #[must_use]
    pub fn with_reclustering(mut self, enabled: bool) -> Self {
        self.reclustering = enabled;
        self
    }

    /// Enables or disables debug traces.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the reclustering energy ceiling.
    #[must_use]
    pub fn with_max_cluster_energy(mut self, energy: f64) -> Self {
        self.recluster.max_cluster_energy = energy;
        self
    }

    /// Replaces the reclustering parameters.
    #[must_use]
    pub fn with_recluster(mut self, recluster: ReclusterConfig) -> Self {
        self.recluster = recluster;
        self
    }

    /// Replaces the cross-layer parameters.
    #[must_use]
    pub fn with_linking(mut self, linking: LinkingConfig) -> Self {
        self.linking = linking;
        self
    }

    /// Replaces the physical layer layout.
    #[must_use]
    pub fn with_geometry(mut self, geometry: LayerGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Maximum linking distance within a layer.
    #[must_use]
    pub fn max_link_distance(&self) -> f64 {
        self.seed_separation.max(self.outlier_separation)
    }

    /// True when reclustering is enabled and will run, i.e. in single-layer mode.
    #[must_use]
    pub fn reclustering_active(&self) -> bool {
        self.reclustering && self.effective_layer_count() == 1
    }

    /// Layer count clamped into `[1, geometry.max_layers()]`.
    #[must_use]
    pub fn effective_layer_count(&self) -> usize {
        self.layer_count.clamp(1, self.geometry.max_layers())
    }

    /// Checks that every distance and energy is finite and non-negative.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("bucket_side", self.bucket_side),
            ("seed_density", self.seed_density),
            ("seed_separation", self.seed_separation),
            ("outlier_separation", self.outlier_separation),
            ("recluster.max_cluster_energy", self.recluster.max_cluster_energy),
            ("recluster.centroid_radius", self.recluster.centroid_radius),
            ("recluster.threshold_floor", self.recluster.threshold_floor),
            ("linking.seed_separation", self.linking.seed_separation),
            ("linking.outlier_separation", self.linking.outlier_separation),
            ("linking.seed_density", self.linking.seed_density),
            ("geometry.air_gap", self.geometry.air_gap),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(self.recluster.shrink_factor.is_finite() && self.recluster.shrink_factor > 1.0) {
            return Err(Error::Config(format!(
                "recluster.shrink_factor must be greater than 1, got {}",
                self.recluster.shrink_factor
            )));
        }
        if let Some(t) = self
            .geometry
            .thicknesses
            .iter()
            .find(|t| !t.is_finite() || **t < 0.0)
        {
            return Err(Error::Config(format!(
                "geometry thickness must be finite and non-negative, got {t}"
            )));
        }
        Ok(())
    }
}
