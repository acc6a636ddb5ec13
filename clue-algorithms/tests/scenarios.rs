use approx::assert_relative_eq;
use clue_algorithms::{ClueClustering, HitClustering};
use clue_core::{ClueConfig, HitData, ReclusterConfig};

fn energies(clusters: &[clue_core::Cluster]) -> Vec<f64> {
    let mut energies: Vec<f64> = clusters.iter().map(|c| c.energy).collect();
    energies.sort_by(|a, b| b.total_cmp(a));
    energies
}

/// Two 60 MeV blobs 3 mm apart that merge at the nominal seed separation.
fn double_core() -> Vec<HitData> {
    vec![
        HitData::new(1, -1.5, 0.0, 0.0, 40.0),
        HitData::new(2, -1.5, 1.0, 0.0, 20.0),
        HitData::new(3, 1.5, 0.0, 0.0, 39.0),
        HitData::new(4, 1.5, 1.0, 0.0, 19.0),
    ]
}

fn double_core_config(reclustering: bool) -> ClueConfig {
    ClueConfig::new()
        .with_seed_density(5.0)
        .with_seed_separation(4.0)
        .with_outlier_separation(4.0)
        .with_reclustering(reclustering)
        .with_recluster(ReclusterConfig {
            max_cluster_energy: 100.0,
            centroid_radius: 10.0,
            ..ReclusterConfig::default()
        })
}

#[test]
fn test_two_nearby_hits_merge_far_hit_separate() {
    let hits = vec![
        HitData::new(1, 0.0, 0.0, 0.0, 10.0),
        HitData::new(2, 1.0, 0.0, 0.0, 8.0),
        HitData::new(3, 100.0, 100.0, 0.0, 5.0),
    ];
    let config = ClueConfig::new()
        .with_bucket_side(0.0)
        .with_seed_density(3.0)
        .with_seed_separation(2.0)
        .with_outlier_separation(2.0);
    let (clusters, stats) = ClueClustering::new(config).cluster_hits(&hits);

    assert_eq!(clusters.len(), 2);
    let e = energies(&clusters);
    assert_relative_eq!(e[0], 18.0);
    assert_relative_eq!(e[1], 5.0);

    let merged = clusters.iter().find(|c| c.len() == 2).unwrap();
    let mut ids = merged.hit_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(stats.outliers, 0);
}

#[test]
fn test_identical_positions_form_one_cluster() {
    let hits: Vec<HitData> = (1..=5)
        .map(|i| HitData::new(i, 12.5, -3.25, 200.0, f64::from(i)))
        .collect();
    let config = ClueConfig::new().with_seed_density(1.0);
    let (clusters, stats) = ClueClustering::new(config).cluster_hits(&hits);

    assert_eq!(stats.density_nodes, 1);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 5);
    assert_relative_eq!(clusters[0].energy, 15.0);
    assert_relative_eq!(clusters[0].centroid.x, 12.5);
}

#[test]
fn test_no_split_when_reclustering_disabled() {
    let hits = double_core();
    let (clusters, stats) = ClueClustering::new(double_core_config(false)).cluster_hits(&hits);

    assert_eq!(clusters.len(), 1);
    assert_relative_eq!(clusters[0].energy, 118.0);
    assert_eq!(stats.recluster_loops, 1);
    assert!(stats.converged);
}

#[test]
fn test_reclustering_splits_overloaded_cluster() {
    let hits = double_core();
    let (clusters, stats) = ClueClustering::new(double_core_config(true)).cluster_hits(&hits);

    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|c| c.energy <= 100.0));
    assert!(stats.converged);
    assert!(stats.recluster_loops > 1);
    assert_eq!(stats.initial_cluster_count, 1);
    assert_eq!(stats.delta_c_history.len(), stats.recluster_loops);
}

#[test]
fn test_reclustering_iteration_cap() {
    let hits = double_core();
    let mut config = double_core_config(true);
    config.recluster.max_iterations = 1;
    let (clusters, stats) = ClueClustering::new(config).cluster_hits(&hits);

    assert_eq!(clusters.len(), 1);
    assert_relative_eq!(clusters[0].energy, 118.0);
    assert_eq!(stats.recluster_loops, 1);
    assert!(!stats.converged);
}

#[test]
fn test_reclustering_threshold_floor() {
    let hits = double_core();
    let mut config = double_core_config(true);
    config.recluster.threshold_floor = 0.95;
    let (clusters, stats) = ClueClustering::new(config).cluster_hits(&hits);

    assert_eq!(clusters.len(), 1);
    assert_eq!(stats.recluster_loops, 2);
    assert!(!stats.converged);
}

#[test]
fn test_shrink_only_applies_near_event_centroid() {
    // Same pair far from the event centroid, pulled away by a heavy deposit.
    let mut hits: Vec<HitData> = double_core()
        .into_iter()
        .map(|mut h| {
            h.x += 60.0;
            h
        })
        .collect();
    hits.push(HitData::new(9, -600.0, 0.0, 0.0, 90.0));
    let (clusters, stats) = ClueClustering::new(double_core_config(true)).cluster_hits(&hits);

    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().any(|c| (c.energy - 118.0).abs() < 1e-9));
    assert!(!stats.converged);
}

#[test]
fn test_empty_input() {
    let algo = ClueClustering::new(ClueConfig::new().with_layer_count(5));
    let mut state = algo.create_state();
    let hits: Vec<HitData> = Vec::new();
    let clusters = algo.cluster(&hits, &mut state);

    assert!(clusters.is_empty());
    assert_eq!(algo.statistics(&state).layers_built, 0);
}
