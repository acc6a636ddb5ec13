//! clue-io: reading calorimeter hits and writing CLUE clusters.
//!
//! Hits are read from CSV or JSON files grouped by event number; clusters
//! are written back as CSV rows or JSON records.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{Event, HitFileReader, HitFormat};
pub use writer::{ClusterFileWriter, ClusterRecord};
