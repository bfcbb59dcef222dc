//! # Record Processor Module
//!
//! Worker per un singolo record del manifest.
//!
//! ## Macchina a stati:
//! ```text
//! Locate -> ConvertIfEnabled -> DeriveName -> Materialize -> WriteMetadata -> RecordArtifact
//! ```
//! eseguita per la foto principale e poi per la secondaria; infine il video
//! BTS (se presente): `Locate -> TranscodeOrCopy -> RecordArtifact`.
//!
//! ## Contatori:
//! - conversione fallita: `skipped`, il ruolo viene abbandonato
//! - file materializzato (anche senza metadata): `processed`
//! - file sorgente assente: errore del record, nessun contatore toccato

use crate::{
    config::Config,
    error::ProcessError,
    file_manager::FileManager,
    image_processor::ImageProcessor,
    manifest::ManifestRecord,
    metadata::{CaptureInfo, PhotoMetadataWriter},
    processor::path_resolver::{PathResolver, Role},
    progress::RunCounters,
    time::{filename_timestamp, CivilZone},
    video_processor::VideoProcessor,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A file written to the output directory
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub final_path: PathBuf,
    pub role: Role,
    pub capture: CaptureInfo,
}

/// Artifacts produced by one record
#[derive(Debug, Default)]
pub struct RecordOutcome {
    pub primary: Option<OutputArtifact>,
    pub secondary: Option<OutputArtifact>,
    pub bts: Option<OutputArtifact>,
}

/// Processes the files of one manifest record
pub struct RecordProcessor {
    config: Config,
    zone: CivilZone,
    image_processor: ImageProcessor,
    video_processor: VideoProcessor,
    metadata_writer: PhotoMetadataWriter,
}

impl RecordProcessor {
    pub fn new(config: Config) -> Self {
        let zone = CivilZone::from_name(&config.timezone);
        Self {
            image_processor: ImageProcessor::new(&config),
            video_processor: VideoProcessor::new(&config),
            metadata_writer: PhotoMetadataWriter::new(zone),
            zone,
            config,
        }
    }

    pub fn image_processor(&self) -> &ImageProcessor {
        &self.image_processor
    }

    pub fn metadata_writer(&self) -> &PhotoMetadataWriter {
        &self.metadata_writer
    }

    pub fn zone(&self) -> CivilZone {
        self.zone
    }

    /// Run primary, secondary and BTS through the pipeline
    pub async fn process(
        &self,
        record: &ManifestRecord,
        resolver: &mut PathResolver,
        counters: &mut RunCounters,
    ) -> Result<RecordOutcome> {
        let capture = CaptureInfo {
            captured_at: record.taken_at,
            location: record.location,
            caption: record.caption.clone(),
        };
        let timestamp = filename_timestamp(self.zone.to_civil(record.taken_at));
        debug!("Record {} uses timestamp {}", record.describe(), timestamp);

        let primary = self
            .process_photo(&record.primary_path, Role::Primary, &timestamp, &capture, resolver, counters)
            .await?;
        let secondary = self
            .process_photo(&record.secondary_path, Role::Secondary, &timestamp, &capture, resolver, counters)
            .await?;

        let bts = match &record.bts_path {
            Some(bts_path) => {
                self.process_bts(bts_path, &timestamp, &capture, resolver, counters)
                    .await?
            }
            None => None,
        };

        Ok(RecordOutcome { primary, secondary, bts })
    }

    /// `Ok(None)` when the conversion failed and the role was skipped
    async fn process_photo(
        &self,
        manifest_path: &Path,
        role: Role,
        timestamp: &str,
        capture: &CaptureInfo,
        resolver: &mut PathResolver,
        counters: &mut RunCounters,
    ) -> Result<Option<OutputArtifact>> {
        let stores = [self.config.photo_dir(), self.config.legacy_photo_dir()];
        let source = FileManager::locate(manifest_path, &stores).ok_or_else(|| {
            ProcessError::Filesystem(format!(
                "{} image {} not found in {} or {}",
                role,
                manifest_path.display(),
                stores[0].display(),
                stores[1].display()
            ))
        })?;
        info!("Found {} image: {}", role, source.display());

        let processing = &self.config.processing;
        let extension = PathResolver::image_extension(&source, processing);
        let target = resolver.derive(&self.config.output_dir, timestamp, role, &source, &extension, processing);
        FileManager::ensure_parent_dirs(&target).await?;

        if processing.convert_to_target_format && ImageProcessor::needs_conversion(&source) {
            if self.image_processor.convert(&source, &target).is_none() {
                warn!("Skipping {} image {} after failed conversion", role, source.display());
                counters.add_skipped();
                return Ok(None);
            }
            counters.add_converted();
        } else {
            FileManager::copy_file(&source, &target).await?;
        }

        let report = self.metadata_writer.apply(&target, capture).await;
        debug!(
            "Metadata for {}: exif={}, iptc={}",
            target.display(),
            report.exif_written,
            report.iptc_written
        );

        counters.add_processed();
        info!("Successfully processed {} image: {}", role, target.display());

        Ok(Some(OutputArtifact {
            final_path: target,
            role,
            capture: capture.clone(),
        }))
    }

    /// Tag the clip through ffmpeg, falling back to a plain copy
    async fn process_bts(
        &self,
        manifest_path: &Path,
        timestamp: &str,
        capture: &CaptureInfo,
        resolver: &mut PathResolver,
        counters: &mut RunCounters,
    ) -> Result<Option<OutputArtifact>> {
        let Some(file_name) = manifest_path.file_name() else {
            return Ok(None);
        };
        let source = self.config.data_dir.join(file_name);
        if !source.is_file() || !FileManager::has_extension(&source, "mp4") {
            debug!("No usable BTS video at {}", source.display());
            return Ok(None);
        }

        let target = resolver.derive(
            &self.config.output_dir,
            timestamp,
            Role::Bts,
            &source,
            "mp4",
            &self.config.processing,
        );

        match self.video_processor.write_container_tags(&source, &target, capture).await {
            Ok(()) => info!("Successfully processed BTS video: {}", target.display()),
            Err(e) => {
                error!("Failed to write container metadata for {}: {}", source.display(), e);
                FileManager::copy_file(&source, &target).await?;
                warn!("Copied BTS video without metadata: {}", target.display());
            }
        }
        counters.add_processed();

        Ok(Some(OutputArtifact {
            final_path: target,
            role: Role::Bts,
            capture: capture.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::metadata::read_photo_metadata;
    use chrono::{TimeZone, Utc};
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        config: Config,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().join("data"),
            output_dir: temp_dir.path().join("out"),
            combined_output_dir: temp_dir.path().join("combined"),
            ffmpeg_path: Some(temp_dir.path().join("missing-ffmpeg")),
            show_progress: false,
            ..Config::default()
        };
        std::fs::create_dir_all(config.photo_dir()).unwrap();
        std::fs::create_dir_all(config.legacy_photo_dir()).unwrap();
        Fixture { _temp_dir: temp_dir, config }
    }

    fn write_webp(path: &Path) {
        RgbImage::from_pixel(24, 32, Rgb([90, 160, 220]))
            .save_with_format(path, ImageFormat::WebP)
            .unwrap();
    }

    fn record(bts: Option<&str>) -> ManifestRecord {
        ManifestRecord {
            index: 0,
            primary_path: PathBuf::from("/Photos/post/front.webp"),
            secondary_path: PathBuf::from("/Photos/post/back.webp"),
            taken_at: Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap(),
            location: Some(GeoPoint::new(48.8566, 2.3522)),
            caption: Some("Paris".to_string()),
            bts_path: bts.map(PathBuf::from),
        }
    }

    #[tokio::test]
    async fn test_converts_and_names_both_photos() {
        let fixture = fixture();
        write_webp(&fixture.config.photo_dir().join("front.webp"));
        // Legacy store is searched too
        write_webp(&fixture.config.legacy_photo_dir().join("back.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut resolver = PathResolver::new();
        let mut counters = RunCounters::new();
        let outcome = processor.process(&record(None), &mut resolver, &mut counters).await.unwrap();

        let primary = outcome.primary.unwrap();
        let secondary = outcome.secondary.unwrap();
        assert_eq!((primary.role, secondary.role), (Role::Primary, Role::Secondary));
        assert_eq!(primary.final_path, fixture.config.output_dir.join("2024-07-15T14-00-00_primary.jpg"));
        assert_eq!(secondary.final_path, fixture.config.output_dir.join("2024-07-15T14-00-00_secondary.jpg"));
        assert_eq!(counters, RunCounters { processed: 2, converted: 2, skipped: 0, combined: 0 });

        let metadata = read_photo_metadata(&primary.final_path).await.unwrap();
        assert_eq!(metadata.date_time_original.as_deref(), Some("2024:07:15 14:00:00"));
        assert_eq!(metadata.description.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_missing_secondary_is_a_record_error() {
        let fixture = fixture();
        write_webp(&fixture.config.photo_dir().join("front.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let result = processor.process(&record(None), &mut PathResolver::new(), &mut counters).await;

        assert!(result.is_err());
        // Only the primary was counted
        assert_eq!(counters, RunCounters { processed: 1, converted: 1, skipped: 0, combined: 0 });
    }

    #[tokio::test]
    async fn test_failed_conversion_is_skipped() {
        let fixture = fixture();
        std::fs::write(fixture.config.photo_dir().join("front.webp"), b"RIFF0000WEBPjunk").unwrap();
        write_webp(&fixture.config.photo_dir().join("back.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let outcome = processor
            .process(&record(None), &mut PathResolver::new(), &mut counters)
            .await
            .unwrap();

        assert!(outcome.primary.is_none());
        assert!(outcome.secondary.is_some());
        assert_eq!(counters, RunCounters { processed: 1, converted: 1, skipped: 1, combined: 0 });
    }

    #[tokio::test]
    async fn test_copy_mode_keeps_extension_and_original_stem() {
        let mut fixture = fixture();
        fixture.config.processing.convert_to_target_format = false;
        fixture.config.processing.preserve_original_name = true;
        write_webp(&fixture.config.photo_dir().join("front.webp"));
        write_webp(&fixture.config.photo_dir().join("back.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let outcome = processor
            .process(&record(None), &mut PathResolver::new(), &mut counters)
            .await
            .unwrap();

        assert_eq!(
            outcome.primary.unwrap().final_path,
            fixture.config.output_dir.join("2024-07-15T14-00-00_primary_front.webp")
        );
        assert_eq!(counters.converted, 0);
        assert_eq!(counters.processed, 2);
    }

    #[tokio::test]
    async fn test_metadata_failure_still_counts_as_processed() {
        let mut fixture = fixture();
        fixture.config.processing.convert_to_target_format = false;
        // RIFF/WEBP signature with a body no container parser accepts
        let broken = b"RIFF0000WEBPjunk".to_vec();
        std::fs::write(fixture.config.photo_dir().join("front.webp"), &broken).unwrap();
        write_webp(&fixture.config.photo_dir().join("back.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let outcome = processor
            .process(&record(None), &mut PathResolver::new(), &mut counters)
            .await
            .unwrap();

        let primary = outcome.primary.unwrap();
        assert_eq!(primary.final_path, fixture.config.output_dir.join("2024-07-15T14-00-00_primary.webp"));
        assert_eq!(std::fs::read(&primary.final_path).unwrap(), broken);
        assert!(outcome.secondary.is_some());
        assert_eq!(counters, RunCounters { processed: 2, converted: 0, skipped: 0, combined: 0 });
    }

    #[tokio::test]
    async fn test_bts_falls_back_to_copy() {
        let fixture = fixture();
        write_webp(&fixture.config.photo_dir().join("front.webp"));
        write_webp(&fixture.config.photo_dir().join("back.webp"));
        std::fs::write(fixture.config.data_dir.join("clip.mp4"), b"mp4 bytes").unwrap();

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let outcome = processor
            .process(&record(Some("/bts/clip.mp4")), &mut PathResolver::new(), &mut counters)
            .await
            .unwrap();

        let bts = outcome.bts.unwrap();
        assert_eq!(bts.role, Role::Bts);
        assert_eq!(bts.final_path, fixture.config.output_dir.join("2024-07-15T14-00-00_bts.mp4"));
        assert_eq!(std::fs::read(&bts.final_path).unwrap(), b"mp4 bytes");
        assert_eq!(counters.processed, 3);
    }

    #[tokio::test]
    async fn test_missing_bts_is_ignored() {
        let fixture = fixture();
        write_webp(&fixture.config.photo_dir().join("front.webp"));
        write_webp(&fixture.config.photo_dir().join("back.webp"));

        let processor = RecordProcessor::new(fixture.config.clone());
        let mut counters = RunCounters::new();
        let outcome = processor
            .process(&record(Some("/bts/gone.mp4")), &mut PathResolver::new(), &mut counters)
            .await
            .unwrap();

        assert!(outcome.bts.is_none());
        assert_eq!(counters.processed, 2);
    }
}
