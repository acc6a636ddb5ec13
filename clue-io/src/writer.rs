//! Cluster file writers.

use crate::Result;
use clue_core::{Cluster, Hit};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flat summary of one output cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Event number.
    pub event: u64,
    /// Index of the cluster within its event.
    pub cluster: usize,
    /// Summed energy.
    pub energy: f64,
    /// Centroid x.
    pub x: f64,
    /// Centroid y.
    pub y: f64,
    /// Centroid z.
    pub z: f64,
    /// Number of member hits.
    pub n_hits: usize,
    /// Energy in the first physical layer.
    pub first_layer_energy: f64,
    /// First-layer centroid x.
    pub first_layer_x: f64,
    /// First-layer centroid y.
    pub first_layer_y: f64,
    /// First-layer centroid z.
    pub first_layer_z: f64,
    /// Identifiers of the member hits.
    pub hit_ids: Vec<u32>,
}

impl ClusterRecord {
    /// Summarises one cluster.
    pub fn from_cluster<H: Hit>(event: u64, index: usize, cluster: &Cluster<H>) -> Self {
        Self {
            event,
            cluster: index,
            energy: cluster.energy,
            x: cluster.centroid.x,
            y: cluster.centroid.y,
            z: cluster.centroid.z,
            n_hits: cluster.len(),
            first_layer_energy: cluster.first_layer.energy,
            first_layer_x: cluster.first_layer.centroid.x,
            first_layer_y: cluster.first_layer.centroid.y,
            first_layer_z: cluster.first_layer.centroid.z,
            hit_ids: cluster.hit_ids(),
        }
    }

    /// Summarises all clusters of an event.
    pub fn from_event<H: Hit>(event: u64, clusters: &[Cluster<H>]) -> Vec<Self> {
        clusters
            .iter()
            .enumerate()
            .map(|(i, c)| Self::from_cluster(event, i, c))
            .collect()
    }
}

/// Writer for clustering output.
pub struct ClusterFileWriter {
    writer: BufWriter<File>,
}

impl ClusterFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the clusters of one event as CSV rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_clusters_csv<H: Hit>(
        &mut self,
        event: u64,
        clusters: &[Cluster<H>],
        header: bool,
    ) -> Result<()> {
        if header {
            writeln!(
                self.writer,
                "event,cluster,energy,x,y,z,n_hits,first_layer_energy,first_layer_x,first_layer_y,first_layer_z"
            )?;
        }

        for (i, c) in clusters.iter().enumerate() {
            let first = &c.first_layer;
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{},{}",
                event,
                i,
                c.energy,
                c.centroid.x,
                c.centroid.y,
                c.centroid.z,
                c.len(),
                first.energy,
                first.centroid.x,
                first.centroid.y,
                first.centroid.z
            )?;
        }
        Ok(())
    }

    /// Writes cluster records as a JSON array.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_clusters_json(&mut self, records: &[ClusterRecord]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, records)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
