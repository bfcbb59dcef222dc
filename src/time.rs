//! # Capture Time Module
//!
//! Converte l'istante UTC del manifest nell'ora civile usata nei metadata.
//!
//! ## Responsabilità:
//! - Parsing di `takenAt` (`YYYY-MM-DDTHH:MM:SS.ffffffZ`, sempre UTC)
//! - Conversione UTC → ora civile senza offset (EXIF non ha un campo timezone)
//! - Fallback basato su regole CET/CEST quando la zona non è disponibile
//! - Formattazione per EXIF, nomi file e tag del container video
//!
//! ## Regole CET/CEST:
//! - Ora legale dall'ultima domenica di marzo alle 02:00 UTC
//! - fino all'ultima domenica di ottobre alle 01:00 UTC
//! - UTC+2 dentro la finestra, UTC+1 fuori

use crate::error::{ProcessError, ProcessResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

const TAKEN_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Civil calendar the capture time is rendered in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CivilZone {
    /// Zone from the tz database
    Named(Tz),
    /// Hardcoded CET/CEST transition rules
    CentralEuropeanRules,
}

impl Default for CivilZone {
    fn default() -> Self {
        Self::Named(chrono_tz::Europe::Berlin)
    }
}

impl CivilZone {
    /// Resolve an IANA zone name, falling back to the CET/CEST rules
    pub fn from_name(name: &str) -> Self {
        match name.parse::<Tz>() {
            Ok(tz) => Self::Named(tz),
            Err(_) => {
                warn!("Unknown timezone '{}', using CET/CEST rules", name);
                Self::CentralEuropeanRules
            }
        }
    }

    /// Wall-clock time of `instant` in this zone, without offset
    pub fn to_civil(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).naive_local(),
            Self::CentralEuropeanRules => central_european_civil(instant),
        }
    }
}

/// Rule-based CET/CEST conversion
pub fn central_european_civil(instant: DateTime<Utc>) -> NaiveDateTime {
    let utc = instant.naive_utc();
    let in_summer_time = summer_time_window(utc.year())
        .map(|(start, end)| start <= utc && utc < end)
        .unwrap_or(false);
    let offset_hours = if in_summer_time { 2 } else { 1 };
    utc + Duration::hours(offset_hours)
}

/// UTC bounds of the summer time window for `year`
fn summer_time_window(year: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = last_sunday(year, 3)?.and_hms_opt(2, 0, 0)?;
    let end = last_sunday(year, 10)?.and_hms_opt(1, 0, 0)?;
    Some((start, end))
}

/// Last Sunday of a 31-day month
fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let last_day = NaiveDate::from_ymd_opt(year, month, 31)?;
    let back = last_day.weekday().num_days_from_sunday() as i64;
    Some(last_day - Duration::days(back))
}

/// Parse the manifest `takenAt` field as a UTC instant
pub fn parse_taken_at(value: &str) -> ProcessResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, TAKEN_AT_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProcessError::Manifest(format!("invalid takenAt '{}': {}", value, e)))
}

/// `YYYY:MM:DD HH:MM:SS`, the EXIF date layout
pub fn exif_datetime(civil: NaiveDateTime) -> String {
    civil.format("%Y:%m:%d %H:%M:%S").to_string()
}

/// `YYYY-MM-DDTHH-MM-SS`, safe for filenames
pub fn filename_timestamp(civil: NaiveDateTime) -> String {
    civil.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// `YYYY-MM-DDTHH:MM:SSZ` for the video `creation_time` tag
pub fn container_creation_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
