//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ProcessingConfig` con le tre scelte dell'utente (conversione,
//!   nome originale, immagini combinate)
//! - Definisce la struct `Config` con path, qualità e tool esterni
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Layout export:
//! ```text
//! <data_dir>/posts.json          manifest
//! <data_dir>/Photos/post/        foto (formato corrente)
//! <data_dir>/Photos/bereal/      foto (formato legacy)
//! <data_dir>/<clip>.mp4          video BTS
//! ```
//!
//! La configurazione viene costruita prima dell'avvio e non cambia durante
//! l'esecuzione: il core non chiede mai input interattivo.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     jpeg_quality: 90,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The three user choices that shape a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Re-encode WebP photos as JPEG
    pub convert_to_target_format: bool,
    /// Append the original file stem to the derived filename
    pub preserve_original_name: bool,
    /// Produce a combined primary+secondary image per record
    pub produce_combined_artifacts: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            convert_to_target_format: true,
            preserve_original_name: false,
            produce_combined_artifacts: true,
        }
    }
}

/// Configuration for an export run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingConfig,
    /// Root of the unpacked export
    pub data_dir: PathBuf,
    /// Output directory for singular images and clips
    pub output_dir: PathBuf,
    /// Output directory for combined images
    pub combined_output_dir: PathBuf,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Explicit ffmpeg executable (None = resolve from PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// IANA zone used for the civil capture time
    pub timezone: String,
    /// Draw a progress bar while processing records
    pub show_progress: bool,
    /// Print the run summary as JSON on stdout
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig::default(),
            data_dir: PathBuf::from("resources/data"),
            output_dir: PathBuf::from("out/__processed"),
            combined_output_dir: PathBuf::from("out/__combined"),
            jpeg_quality: 80,
            ffmpeg_path: None,
            timezone: "Europe/Berlin".to_string(),
            show_progress: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.output_dir == self.combined_output_dir {
            return Err(anyhow::anyhow!(
                "Combined output directory must differ from the output directory: {}",
                self.output_dir.display()
            ));
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(anyhow::anyhow!("Data path is not a directory: {}", self.data_dir.display()));
        }

        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join("posts.json")
    }

    /// Current-format photo store
    pub fn photo_dir(&self) -> PathBuf {
        self.data_dir.join("Photos").join("post")
    }

    /// Legacy photo store of older exports
    pub fn legacy_photo_dir(&self) -> PathBuf {
        self.data_dir.join("Photos").join("bereal")
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.jpeg_quality = 101;
        assert!(config.validate().is_err());

        config.jpeg_quality = 80;
        config.combined_output_dir = config.output_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.processing.convert_to_target_format);
        assert!(!config.processing.preserve_original_name);
        assert!(config.processing.produce_combined_artifacts);
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.manifest_path(), PathBuf::from("resources/data/posts.json"));
        assert_eq!(config.legacy_photo_dir(), PathBuf::from("resources/data/Photos/bereal"));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            processing: ProcessingConfig {
                convert_to_target_format: false,
                preserve_original_name: true,
                produce_combined_artifacts: false,
            },
            jpeg_quality: 92,
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.processing, original_config.processing);
        assert_eq!(loaded_config.jpeg_quality, 92);
        assert_eq!(loaded_config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
    }

    #[tokio::test]
    async fn test_missing_config_file_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.jpeg_quality, 80);
    }

    #[tokio::test]
    async fn test_partial_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "jpeg_quality": 70 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.output_dir, PathBuf::from("out/__processed"));
    }
}
