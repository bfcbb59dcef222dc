//! # Video Processing Module
//!
//! Scrittura dei tag di container sui video BTS ("behind the scenes").
//!
//! ## Responsabilità:
//! - Invocazione di FFmpeg in modalità `copy` (nessuna ricodifica)
//! - Tag `creation_time` in UTC (`YYYY-MM-DDTHH:MM:SSZ`)
//! - Tag `location` in forma ISO 6709 se la posizione è presente
//! - Output scritto in un file temporaneo nella cartella di destinazione,
//!   spostato sul percorso finale solo se FFmpeg termina con successo
//!
//! ## Contratto col collaboratore esterno:
//! - exit code 0: output completo e affidabile
//! - exit code diverso da 0 o eseguibile assente: errore `Collaborator`,
//!   il file temporaneo viene scartato
//!
//! Il fallback (copia byte per byte senza metadata) spetta al chiamante.
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = VideoProcessor::new(&config);
//! if processor.write_container_tags(&input, &output, &capture).await.is_err() {
//!     FileManager::copy_file(&input, &output).await?;
//! }
//! ```

use crate::args;
use crate::config::Config;
use crate::error::{ProcessError, ProcessResult};
use crate::metadata::CaptureInfo;
use crate::platform::PlatformCommands;
use crate::time::container_creation_time;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tokio::process::Command;
use tracing::{debug, info};

/// Writes container-level tags through FFmpeg
pub struct VideoProcessor {
    ffmpeg: PathBuf,
}

impl VideoProcessor {
    pub fn new(config: &Config) -> Self {
        let ffmpeg = PlatformCommands::instance().resolve_ffmpeg(config.ffmpeg_path.as_deref());
        Self { ffmpeg }
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Copy `input` to `output` with `creation_time` and optional `location` tags
    pub async fn write_container_tags(
        &self,
        input: &Path,
        output: &Path,
        capture: &CaptureInfo,
    ) -> ProcessResult<()> {
        let output_dir = output.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(output_dir).await?;

        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staged = Builder::new()
            .prefix(".bts-")
            .suffix(&suffix)
            .tempfile_in(output_dir)?;

        let args = Self::build_args(input, staged.path(), capture);
        debug!("Running {} {:?}", self.ffmpeg.display(), args);

        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .output()
            .await
            .map_err(|e| ProcessError::Collaborator(format!("failed to execute {}: {}", self.ffmpeg.display(), e)))?;

        if !result.status.success() {
            return Err(ProcessError::Collaborator(format!(
                "{} exited with {}: {}",
                self.ffmpeg.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        staged
            .persist(output)
            .map_err(|e| ProcessError::Filesystem(format!("cannot move video into {}: {}", output.display(), e.error)))?;
        info!("Updated container metadata for {}", output.display());
        Ok(())
    }

    fn build_args(input: &Path, output: &Path, capture: &CaptureInfo) -> Vec<OsString> {
        let mut args = args![
            "-y",
            "-i",
            input,
            "-c",
            "copy",
            "-movflags",
            "use_metadata_tags",
            "-metadata",
            format!("creation_time={}", container_creation_time(capture.captured_at)),
        ];

        if let Some(location) = &capture.location {
            args.extend(args!["-metadata", format!("location={}", location.to_iso6709())]);
        }

        args.extend(args!["-loglevel", "error", output]);
        args
    }
}
