//! Cross-layer linking of per-layer seeds.
//!
//! Each 2D cluster (represented by its merged seed node) looks for the
//! closest higher-energy 2D cluster in the layer directly before and the
//! layer directly after its own. An empty neighbouring layer is not
//! skipped. The resulting arena feeds one more clustering pass.

use crate::density::Density;

/// Links per-layer seed lists into one arena sorted by descending energy.
///
/// A candidate replaces the current best only if both its planar and its z
/// distance are smaller; planar distances must also stay below
/// `max_distance`.
pub fn link_layers<H>(
    layer_seeds: Vec<Vec<Density<H>>>,
    max_distance: f64,
    debug: bool,
) -> Vec<Density<H>> {
    let layer_count = layer_seeds.len();
    let mut nodes: Vec<Density<H>> = layer_seeds
        .into_iter()
        .enumerate()
        .flat_map(|(layer, seeds)| {
            seeds.into_iter().map(move |mut seed| {
                seed.layer = layer;
                seed.unlink();
                seed
            })
        })
        .collect();
    nodes.sort_by(|a, b| b.total_energy.total_cmp(&a.total_energy));

    // Global order is energy order, so every per-layer list is too.
    let mut by_layer: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for (index, node) in nodes.iter().enumerate() {
        by_layer[node.layer].push(index);
    }

    for i in 0..nodes.len() {
        let layer = nodes[i].layer;
        let energy = nodes[i].total_energy;
        let position = nodes[i].position;

        let previous = layer.checked_sub(1);
        let next = Some(layer + 1).filter(|&l| l < layer_count);

        let mut best = max_distance;
        let mut best_z = f64::INFINITY;
        let mut follower_of = None;

        for neighbour in previous.into_iter().chain(next) {
            for &j in &by_layer[neighbour] {
                let other = &nodes[j];
                if other.total_energy <= energy {
                    break;
                }
                let d = position.planar_distance(&other.position);
                let dz = (position.z - other.position.z).abs();
                if d < best && dz < best_z {
                    best = d;
                    best_z = dz;
                    follower_of = Some(j);
                }
            }
        }

        let node = &mut nodes[i];
        if follower_of.is_some() {
            node.follower_of = follower_of;
            node.separation = best;
            node.z_separation = best_z;
        }
        if debug {
            log::debug!(
                "seed {i}: layer {layer} E={energy:.3} follower_of={:?} delta={} dz={}",
                node.follower_of,
                node.separation,
                node.z_separation
            );
        }
    }

    nodes
}
