//! Hit file readers.
//!

use crate::{Error, Result};
use clue_core::HitData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 6] = ["event", "id", "x", "y", "z", "energy"];

/// Supported hit file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitFormat {
    /// `event,id,x,y,z,energy` rows.
    Csv,
    /// Array of [`Event`] objects.
    Json,
}

impl HitFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// All hits of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event number as found in the input.
    pub number: u64,
    /// Hits of the event, in file order.
    pub hits: Vec<HitData>,
}

/// Reader for hit files.
///
/// The whole file is loaded on open; events are parsed on demand.
pub struct HitFileReader {
    path: PathBuf,
    format: HitFormat,
    contents: String,
}

impl HitFileReader {
    /// Opens a hit file, choosing the format from its extension.
    ///
    /// # Errors
    /// Returns an error if the extension is unknown or the file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = HitFormat::from_path(path)?;
        Self::open_as(path, format)
    }

    /// Opens a hit file with an explicit format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn open_as<P: AsRef<Path>>(path: P, format: HitFormat) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            format,
            contents,
        })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected format.
    #[must_use]
    pub fn format(&self) -> HitFormat {
        self.format
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.contents.len()
    }

    /// Parses all events.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for malformed input and
    /// [`Error::Core`] for hits with non-finite values.
    pub fn read_events(&self) -> Result<Vec<Event>> {
        let events = match self.format {
            HitFormat::Csv => parse_csv(&self.contents)?,
            HitFormat::Json => parse_json(&self.contents)?,
        };
        log::debug!("read {} events from {}", events.len(), self.path.display());
        Ok(events)
    }
}

fn parse_csv(contents: &str) -> Result<Vec<Event>> {
    let mut events: Vec<Event> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut seen_data = false;

    for (i, raw) in contents.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if !seen_data && fields.first() == Some(&CSV_HEADER[0]) {
            if fields != CSV_HEADER {
                return Err(Error::InvalidFormat {
                    line: line_no,
                    reason: format!("expected header {}", CSV_HEADER.join(",")),
                });
            }
            seen_data = true;
            continue;
        }
        seen_data = true;

        if fields.len() != CSV_HEADER.len() {
            return Err(Error::InvalidFormat {
                line: line_no,
                reason: format!(
                    "expected {} fields, found {}",
                    CSV_HEADER.len(),
                    fields.len()
                ),
            });
        }
        let number: u64 = parse_field(fields[0], "event", line_no)?;
        let id: u32 = parse_field(fields[1], "id", line_no)?;
        let x: f64 = parse_field(fields[2], "x", line_no)?;
        let y: f64 = parse_field(fields[3], "y", line_no)?;
        let z: f64 = parse_field(fields[4], "z", line_no)?;
        let energy: f64 = parse_field(fields[5], "energy", line_no)?;
        let hit = HitData::try_new(id, x, y, z, energy)?;

        let slot = *index.entry(number).or_insert_with(|| {
            events.push(Event {
                number,
                hits: Vec::new(),
            });
            events.len() - 1
        });
        events[slot].hits.push(hit);
    }
    Ok(events)
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str, line: usize) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidFormat {
        line,
        reason: format!("cannot parse {name} from '{value}'"),
    })
}

fn parse_json(contents: &str) -> Result<Vec<Event>> {
    let events: Vec<Event> = serde_json::from_str(contents)?;
    for event in &events {
        for hit in &event.hits {
            HitData::try_new(hit.id, hit.x, hit.y, hit.z, hit.energy)?;
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_csv_groups_events_in_order() {
        let file = write_temp(
            ".csv",
            "event,id,x,y,z,energy\n7,1,0.0,0.0,200.0,10\n3,2,1.0,0.0,200.0,5\n\n7,3,2.5,-1.0,210.0,4.5\n",
        );
        let reader = HitFileReader::open(file.path()).unwrap();
        assert_eq!(reader.format(), HitFormat::Csv);

        let events = reader.read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].number, 7);
        assert_eq!(events[0].hits.len(), 2);
        assert_eq!(events[0].hits[1], HitData::new(3, 2.5, -1.0, 210.0, 4.5));
        assert_eq!(events[1].number, 3);
    }

    #[test]
    fn test_csv_without_header() {
        let file = write_temp(".csv", "1,1,0,0,0,1\n");
        let events = HitFileReader::open(file.path())
            .unwrap()
            .read_events()
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_csv_malformed_line() {
        let file = write_temp(".csv", "event,id,x,y,z,energy\n1,1,0,0,0\n");
        let err = HitFileReader::open(file.path())
            .unwrap()
            .read_events()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_csv_non_finite_energy() {
        let file = write_temp(".csv", "1,4,0,0,0,NaN\n");
        let err = HitFileReader::open(file.path())
            .unwrap()
            .read_events()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(clue_core::Error::InvalidHit { id: 4, .. })
        ));
    }

    #[test]
    fn test_json_events() {
        let file = write_temp(
            ".json",
            r#"[{"number": 1, "hits": [{"id": 1, "x": 0.5, "y": 0.0, "z": 200.0, "energy": 3.0}]}]"#,
        );
        let events = HitFileReader::open(file.path())
            .unwrap()
            .read_events()
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].hits[0], HitData::new(1, 0.5, 0.0, 200.0, 3.0));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".bin", "");
        assert!(matches!(
            HitFileReader::open(file.path()),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
