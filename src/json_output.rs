//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per messaggio su stdout) per chi
//! pilota il processore da un altro programma.
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del batch con configurazione
//! - `progress`: record elaborato e contatori correnti
//! - `complete`: riepilogo finale
//! - `error`: errore fatale (manifest illeggibile)

use crate::config::Config;
use crate::progress::{RunCounters, RunSummary};
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        data_dir: PathBuf,
        output_dir: PathBuf,
        combined_output_dir: PathBuf,
        total_records: usize,
        input_files: usize,
        config: JsonConfig,
    },

    #[serde(rename = "progress")]
    Progress {
        current: usize,
        total: usize,
        percentage: f64,
        record_failed: bool,
        counters: RunCounters,
    },

    #[serde(rename = "complete")]
    Complete { summary: RunSummary },

    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub convert_to_target_format: bool,
    pub preserve_original_name: bool,
    pub produce_combined_artifacts: bool,
    pub jpeg_quality: u8,
    pub timezone: String,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(config: &Config, total_records: usize, input_files: usize) -> Self {
        Self::Start {
            data_dir: config.data_dir.clone(),
            output_dir: config.output_dir.clone(),
            combined_output_dir: config.combined_output_dir.clone(),
            total_records,
            input_files,
            config: JsonConfig::from(config),
        }
    }

    pub fn progress(current: usize, total: usize, record_failed: bool, counters: RunCounters) -> Self {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::Progress {
            current,
            total,
            percentage,
            record_failed,
            counters,
        }
    }

    pub fn complete(summary: RunSummary) -> Self {
        Self::Complete { summary }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            convert_to_target_format: config.processing.convert_to_target_format,
            preserve_original_name: config.processing.preserve_original_name,
            produce_combined_artifacts: config.processing.produce_combined_artifacts,
            jpeg_quality: config.jpeg_quality,
            timezone: config.timezone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message_shape() {
        let counters = RunCounters { processed: 2, converted: 2, skipped: 0, combined: 0 };
        let json = serde_json::to_value(JsonMessage::progress(1, 4, false, counters)).unwrap();

        assert_eq!(json["type"], "progress");
        assert_eq!(json["percentage"], 25.0);
        assert_eq!(json["counters"]["processed"], 2);
        assert_eq!(json["record_failed"], false);
    }

    #[test]
    fn test_start_message_carries_config() {
        let config = Config::default();
        let json = serde_json::to_value(JsonMessage::start(&config, 3, 6)).unwrap();

        assert_eq!(json["type"], "start");
        assert_eq!(json["total_records"], 3);
        assert_eq!(json["config"]["jpeg_quality"], 80);
        assert_eq!(json["config"]["timezone"], "Europe/Berlin");
    }

    #[test]
    fn test_error_message() {
        let json = serde_json::to_value(JsonMessage::error("boom".to_string(), None)).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
        assert!(json["details"].is_null());
    }
}
