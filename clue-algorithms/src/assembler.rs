//! Conversion of clustered hit lists into output [`Cluster`] records.

use clue_core::{Cluster, FirstLayerCentroid, Hit, Point3};

/// Running energy-weighted centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CentroidAccumulator {
    centroid: Point3,
    energy: f64,
    count: usize,
}

impl CentroidAccumulator {
    /// Folds one hit into the centroid.
    ///
    /// While the accumulated energy is not positive the plain running mean
    /// of the positions is kept instead.
    pub fn add(&mut self, position: Point3, energy: f64) {
        self.count += 1;
        let new_energy = self.energy + energy;
        if new_energy > 0.0 {
            let w_old = self.energy / new_energy;
            let w_new = energy / new_energy;
            self.centroid.x = self.centroid.x * w_old + position.x * w_new;
            self.centroid.y = self.centroid.y * w_old + position.y * w_new;
            self.centroid.z = self.centroid.z * w_old + position.z * w_new;
        } else {
            #[allow(clippy::cast_precision_loss)]
            let n = self.count as f64;
            self.centroid.x += (position.x - self.centroid.x) / n;
            self.centroid.y += (position.y - self.centroid.y) / n;
            self.centroid.z += (position.z - self.centroid.z) / n;
        }
        self.energy = new_energy;
    }

    /// Current centroid.
    pub fn centroid(&self) -> Point3 {
        self.centroid
    }

    /// Accumulated energy.
    pub fn energy(&self) -> f64 {
        self.energy
    }
}

/// Builds output clusters and their first-layer sub-centroids.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssembler {
    first_layer_boundary: f64,
}

impl ClusterAssembler {
    /// Hits with `z <= first_layer_boundary` count as first-layer hits.
    pub fn new(first_layer_boundary: f64) -> Self {
        Self {
            first_layer_boundary,
        }
    }

    /// Assembles one cluster; returns `None` for an empty hit list.
    pub fn assemble_one<H: Hit + Clone>(&self, hits: &[H]) -> Option<Cluster<H>> {
        if hits.is_empty() {
            return None;
        }

        let mut all = CentroidAccumulator::default();
        let mut first = CentroidAccumulator::default();
        let mut first_hits = Vec::new();
        for hit in hits {
            let position = hit.position();
            all.add(position, hit.energy());
            if position.z <= self.first_layer_boundary {
                first.add(position, hit.energy());
                first_hits.push(hit.clone());
            }
        }

        Some(Cluster {
            energy: all.energy(),
            centroid: all.centroid(),
            hits: hits.to_vec(),
            first_layer: FirstLayerCentroid {
                energy: first.energy(),
                centroid: first.centroid(),
                hits: first_hits,
            },
        })
    }

    /// Assembles every non-empty hit list, dropping empty ones.
    pub fn assemble<H: Hit + Clone>(&self, hit_lists: &[Vec<H>]) -> Vec<Cluster<H>> {
        hit_lists
            .iter()
            .filter_map(|hits| self.assemble_one(hits))
            .collect()
    }
}
