//! Partitioning of an event into z-ordered clustering layers.
//!
//! Two layer indices are tracked while sweeping the hits in z: the physical
//! layer (from the detector geometry) and the clustering layer (an even
//! subdivision of the event's z range). Clustering layers only ever close
//! at a physical layer boundary, so no physical layer is split.

use clue_core::{Hit, LayerGeometry};

/// Hits of one clustering layer.
#[derive(Debug, Clone)]
pub struct Layer<'a, H> {
    /// Member hits, sorted by z.
    pub hits: Vec<&'a H>,
    /// Seed density threshold (`rho_c`) for this layer.
    pub seed_density: f64,
}

/// Ordered clustering layers of one event.
#[derive(Debug, Clone)]
pub struct LayerSet<'a, H> {
    /// Layers in increasing z.
    pub layers: Vec<Layer<'a, H>>,
    /// Last z still inside the first physical layer.
    pub first_layer_boundary: f64,
}

impl<H> LayerSet<'_, H> {
    /// Returns the number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if no layer was built.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Splits hits into clustering layers.
#[derive(Debug, Clone)]
pub struct LayerBuilder<'g> {
    layer_count: usize,
    geometry: &'g LayerGeometry,
    single_layer_density: f64,
}

impl<'g> LayerBuilder<'g> {
    /// Creates a builder for `layer_count` clustering layers.
    ///
    /// `single_layer_density` is the `rho_c` used when `layer_count <= 1`.
    pub fn new(layer_count: usize, geometry: &'g LayerGeometry, single_layer_density: f64) -> Self {
        Self {
            layer_count,
            geometry,
            single_layer_density,
        }
    }

    /// Builds the layers. An empty hit list yields no layers.
    pub fn build<'a, H: Hit>(&self, hits: &'a [H]) -> LayerSet<'a, H> {
        let mut sorted: Vec<&'a H> = hits.iter().collect();
        sorted.sort_by(|a, b| a.z().total_cmp(&b.z()));

        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            return LayerSet {
                layers: Vec::new(),
                first_layer_boundary: f64::NEG_INFINITY,
            };
        };
        let z_min = first.z();
        let z_max = last.z();
        let first_layer_boundary = z_min + self.geometry.pitch(0);

        if self.layer_count <= 1 {
            return LayerSet {
                layers: vec![Layer {
                    hits: sorted,
                    seed_density: self.single_layer_density,
                }],
                first_layer_boundary,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let step = (z_max - z_min) / self.layer_count as f64;

        let mut layers = Vec::with_capacity(self.layer_count);
        let mut current: Vec<&'a H> = Vec::new();
        let mut max_energy = 0.0_f64;
        let mut true_layer = 0usize;
        let mut true_layer_z = z_min;
        let mut cluster_layer_z = z_min;

        for hit in sorted {
            let z = hit.z();
            if z > true_layer_z + self.geometry.pitch(true_layer) {
                true_layer += 1;
                true_layer_z = z;

                if z > cluster_layer_z + step && !current.is_empty() {
                    layers.push(Layer {
                        hits: std::mem::take(&mut current),
                        seed_density: max_energy / 2.0,
                    });
                    max_energy = 0.0;
                    cluster_layer_z = z;
                }
            }
            max_energy = max_energy.max(hit.energy());
            current.push(hit);
        }

        if !current.is_empty() {
            layers.push(Layer {
                hits: current,
                seed_density: max_energy / 2.0,
            });
        }

        LayerSet {
            layers,
            first_layer_boundary,
        }
    }
}
