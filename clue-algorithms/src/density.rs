//! Density nodes and the nearest-higher-density graph of one layer.
//!
//! Hits are collapsed into spatial buckets ("densities"), the buckets are
//! ordered by descending energy and every bucket is linked to the closest
//! bucket of strictly higher energy within the maximum linking distance.
//! Nodes live in a flat arena and refer to each other by index.
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use clue_core::{Hit, Point3};

/// Decimal digits kept when quantising bucket positions.
pub const POSITION_DIGITS: i32 = 4;

/// An aggregation of hits carrying the links used for clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct Density<H> {
    /// Bucket center in x/y, energy-weighted z.
    pub position: Point3,
    /// Summed energy of the member hits.
    pub total_energy: f64,
    /// Index of the closest node with strictly higher energy.
    pub follower_of: Option<usize>,
    /// Planar distance to `follower_of`; infinite if there is none.
    pub separation: f64,
    /// Z distance to `follower_of` (cross-layer pass only).
    pub z_separation: f64,
    /// Cluster assigned during propagation.
    pub cluster_id: Option<usize>,
    /// Clustering layer the node belongs to.
    pub layer: usize,
    /// Member hits.
    pub hits: Vec<H>,
}

impl<H> Density<H> {
    /// Creates an unlinked node.
    pub fn new(position: Point3, total_energy: f64, layer: usize, hits: Vec<H>) -> Self {
        Self {
            position,
            total_energy,
            follower_of: None,
            separation: f64::INFINITY,
            z_separation: f64::INFINITY,
            cluster_id: None,
            layer,
            hits,
        }
    }

    /// Drops any link and cluster assignment.
    pub fn unlink(&mut self) {
        self.follower_of = None;
        self.separation = f64::INFINITY;
        self.z_separation = f64::INFINITY;
        self.cluster_id = None;
    }
}

/// Rounds `value` to [`POSITION_DIGITS`] decimals.
#[inline]
#[must_use]
pub fn round_position(value: f64) -> f64 {
    let scale = 10f64.powi(POSITION_DIGITS);
    (value * scale).round() / scale
}

/// Bucket under construction.
struct Bucket<H> {
    center: (f64, f64),
    energy: f64,
    weighted_z: f64,
    z_sum: f64,
    hits: Vec<H>,
}

impl<H: Hit> Bucket<H> {
    fn z(&self) -> f64 {
        if self.energy > 0.0 {
            self.weighted_z / self.energy
        } else {
            self.z_sum / self.hits.len().max(1) as f64
        }
    }
}

/// Builds the density graph of one layer.
#[derive(Debug, Clone, Copy)]
pub struct DensityGraphBuilder {
    bucket_side: f64,
    max_distance: f64,
    debug: bool,
}

impl DensityGraphBuilder {
    /// Creates a builder.
    ///
    /// `bucket_side` of 0 only merges hits at identical (rounded) positions;
    /// `max_distance` is `max(delta_c, delta_o)`.
    pub fn new(bucket_side: f64, max_distance: f64) -> Self {
        Self {
            bucket_side,
            max_distance,
            debug: false,
        }
    }

    /// Enables per-node debug traces.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn bucket_key(&self, x: f64, y: f64) -> ((i64, i64), (f64, f64)) {
        if self.bucket_side > 0.0 {
            let ix = (x / self.bucket_side).floor() as i64;
            let iy = (y / self.bucket_side).floor() as i64;
            let cx = round_position((ix as f64 + 0.5) * self.bucket_side);
            let cy = round_position((iy as f64 + 0.5) * self.bucket_side);
            ((ix, iy), (cx, cy))
        } else {
            let scale = 10f64.powi(POSITION_DIGITS);
            let ix = (x * scale).round() as i64;
            let iy = (y * scale).round() as i64;
            ((ix, iy), (ix as f64 / scale, iy as f64 / scale))
        }
    }

    /// Buckets `hits` and links every node to its nearest higher-energy node.
    ///
    /// The returned nodes are sorted by descending energy, so index order is
    /// energy order.
    pub fn build<H: Hit + Clone>(&self, hits: &[&H], layer: usize) -> Vec<Density<H>> {
        let mut buckets: BTreeMap<(i64, i64), Bucket<H>> = BTreeMap::new();
        for &hit in hits {
            let (key, center) = self.bucket_key(hit.x(), hit.y());
            let bucket = buckets.entry(key).or_insert_with(|| Bucket {
                center,
                energy: 0.0,
                weighted_z: 0.0,
                z_sum: 0.0,
                hits: Vec::new(),
            });
            bucket.energy += hit.energy();
            bucket.weighted_z += hit.z() * hit.energy();
            bucket.z_sum += hit.z();
            bucket.hits.push(hit.clone());
        }

        let mut nodes: Vec<Density<H>> = buckets
            .into_values()
            .map(|bucket| {
                let position = Point3::new(bucket.center.0, bucket.center.1, bucket.z());
                Density::new(position, bucket.energy, layer, bucket.hits)
            })
            .collect();
        // Stable: equal energies keep bucket-key order.
        nodes.sort_by(|a, b| b.total_energy.total_cmp(&a.total_energy));

        link_nearest_higher(&mut nodes, self.max_distance, self.debug);
        nodes
    }
}

/// Sets `follower_of` and `separation` for nodes sorted by descending energy.
///
/// Only strictly higher-energy nodes closer than `max_distance` qualify; the
/// first node reaching a new minimum wins.
pub fn link_nearest_higher<H>(nodes: &mut [Density<H>], max_distance: f64, debug: bool) {
    for i in 0..nodes.len() {
        let energy = nodes[i].total_energy;
        let position = nodes[i].position;
        let mut best = max_distance;
        let mut follower_of = None;

        for (j, other) in nodes[..i].iter().enumerate() {
            if other.total_energy <= energy {
                break;
            }
            let d = position.planar_distance(&other.position);
            if d < best {
                best = d;
                follower_of = Some(j);
            }
        }

        let node = &mut nodes[i];
        node.follower_of = follower_of;
        node.separation = if follower_of.is_some() { best } else { f64::INFINITY };
        if debug {
            log::debug!(
                "density {i}: layer {} ({:.4}, {:.4}) E={:.3} follower_of={:?} delta={}",
                node.layer,
                node.position.x,
                node.position.y,
                node.total_energy,
                node.follower_of,
                node.separation
            );
        }
    }
}

/// Energy-weighted centroid over all hits, falling back to the plain mean
/// when the total energy is not positive.
pub fn energy_centroid<'a, H: Hit + 'a>(hits: impl IntoIterator<Item = &'a H>) -> Point3 {
    let mut weighted = Point3::default();
    let mut plain = Point3::default();
    let mut energy = 0.0;
    let mut count = 0usize;
    for hit in hits {
        let p = hit.position();
        let e = hit.energy();
        weighted.x += p.x * e;
        weighted.y += p.y * e;
        weighted.z += p.z * e;
        plain.x += p.x;
        plain.y += p.y;
        plain.z += p.z;
        energy += e;
        count += 1;
    }
    if energy > 0.0 {
        Point3::new(weighted.x / energy, weighted.y / energy, weighted.z / energy)
    } else if count > 0 {
        let n = count as f64;
        Point3::new(plain.x / n, plain.y / n, plain.z / n)
    } else {
        Point3::default()
    }
}
