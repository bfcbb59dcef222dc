//! # Manifest Module
//!
//! Lettura di `posts.json` e decodifica difensiva dei singoli record.
//!
//! ## Responsabilità:
//! - Carica il manifest come array JSON (errore fatale se illeggibile)
//! - Decodifica ogni record separatamente: un record malformato produce un
//!   errore per quel record soltanto
//! - I campi opzionali assenti restano `None` (mai valori di default)
//!
//! ## Formato record:
//! ```json
//! {
//!   "primary":   { "path": "/Photos/post/abc.webp" },
//!   "secondary": { "path": "/Photos/post/def.webp" },
//!   "takenAt":   "2024-07-15T12:00:00.000Z",
//!   "location":  { "latitude": 48.8566, "longitude": 2.3522 },
//!   "caption":   "Paris",
//!   "btsMedia":  { "path": "/Photos/post/bts.mp4" }
//! }
//! ```

use crate::error::{ProcessError, ProcessResult};
use crate::geo::GeoPoint;
use crate::time::parse_taken_at;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One post of the export
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRecord {
    /// Position in the manifest array
    pub index: usize,
    pub primary_path: PathBuf,
    pub secondary_path: PathBuf,
    pub taken_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub caption: Option<String>,
    pub bts_path: Option<PathBuf>,
}

impl ManifestRecord {
    /// Decode a raw manifest entry
    pub fn from_value(index: usize, value: &Value) -> ProcessResult<Self> {
        let primary_path = media_path(value.get("primary"))
            .ok_or_else(|| ProcessError::Manifest(format!("record {}: missing primary.path", index)))?;
        let secondary_path = media_path(value.get("secondary"))
            .ok_or_else(|| ProcessError::Manifest(format!("record {}: missing secondary.path", index)))?;
        let taken_at = value
            .get("takenAt")
            .and_then(Value::as_str)
            .ok_or_else(|| ProcessError::Manifest(format!("record {}: missing takenAt", index)))
            .and_then(parse_taken_at)?;

        let location = value.get("location").and_then(|location| {
            let latitude = location.get("latitude").and_then(Value::as_f64)?;
            let longitude = location.get("longitude").and_then(Value::as_f64)?;
            Some(GeoPoint::new(latitude, longitude))
        });

        let caption = value
            .get("caption")
            .and_then(Value::as_str)
            .filter(|caption| !caption.is_empty())
            .map(str::to_string);

        Ok(Self {
            index,
            primary_path,
            secondary_path,
            taken_at,
            location,
            caption,
            bts_path: media_path(value.get("btsMedia")),
        })
    }

    /// Short identity used in log lines
    pub fn describe(&self) -> String {
        format!("#{} ({})", self.index, self.primary_path.display())
    }
}

fn media_path(media: Option<&Value>) -> Option<PathBuf> {
    media
        .and_then(|media| media.get("path"))
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Load the manifest array without decoding its records
pub async fn load_manifest(path: &Path) -> ProcessResult<Vec<Value>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProcessError::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
    let root: Value = serde_json::from_str(&content)
        .map_err(|e| ProcessError::Manifest(format!("cannot parse {}: {}", path.display(), e)))?;

    match root {
        Value::Array(entries) => Ok(entries),
        _ => Err(ProcessError::Manifest(format!(
            "{} does not contain a JSON array",
            path.display()
        ))),
    }
}
