//! # Batch Processor Main Orchestrator
//!
//! Orchestratore del batch: scorre il manifest in ordine, delega ogni record
//! al `RecordProcessor`, accumula i contatori e alla fine esegue il passaggio
//! delle immagini combinate e la pulizia dei backup.
//!
//! ## Isolamento degli errori:
//! - manifest illeggibile: errore fatale, nessun file elaborato
//! - qualunque altro errore: loggato con l'identità del record, si passa al
//!   record successivo
//!
//! ## Accoppiamento per le immagini combinate:
//! Principale e secondaria vengono accoppiate per record: la coppia entra in
//! coda solo se entrambe le metà dello stesso record sono state elaborate.

use crate::{
    compositor,
    config::Config,
    file_manager::FileManager,
    image_processor::ImageProcessor,
    json_output::JsonMessage,
    manifest::{load_manifest, ManifestRecord},
    processor::{
        path_resolver::{PathResolver, Role},
        record_processor::{OutputArtifact, RecordProcessor},
    },
    progress::{ProgressManager, RunCounters, RunSummary},
    time::filename_timestamp,
};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// A record whose two halves are both on disk
#[derive(Debug, Clone)]
struct PendingCombine {
    primary: OutputArtifact,
    secondary: PathBuf,
}

/// Drives a whole export through the pipeline
pub struct BatchProcessor {
    config: Config,
    records: RecordProcessor,
    resolver: PathResolver,
    counters: RunCounters,
    pending: Vec<PendingCombine>,
}

impl BatchProcessor {
    pub fn new(config: Config) -> Self {
        Self {
            records: RecordProcessor::new(config.clone()),
            resolver: PathResolver::new(),
            counters: RunCounters::new(),
            pending: Vec::new(),
            config,
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// WebP files in the current and legacy photo stores
    pub fn count_input_files(&self) -> usize {
        let current = FileManager::count_files_with_extension(&self.config.photo_dir(), "webp");
        let legacy = FileManager::count_files_with_extension(&self.config.legacy_photo_dir(), "webp");
        info!("Number of WebP files in {}: {}", self.config.photo_dir().display(), current);
        if self.config.legacy_photo_dir().is_dir() {
            info!("Number of WebP files in {}: {}", self.config.legacy_photo_dir().display(), legacy);
        }
        current + legacy
    }

    /// Process the whole manifest; fails only if the manifest cannot be loaded
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let manifest_path = self.config.manifest_path();
        info!("Output folder for singular images: {}", self.config.output_dir.display());
        if self.config.processing.produce_combined_artifacts {
            info!(
                "Output folder for combined images: {}",
                self.config.combined_output_dir.display()
            );
        }

        let input_files = self.count_input_files();
        let entries = load_manifest(&manifest_path)
            .await
            .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
        info!("Loaded {} records from {}", entries.len(), manifest_path.display());

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.config.output_dir.display()))?;

        if self.config.json_output {
            JsonMessage::start(&self.config, entries.len(), input_files).emit();
        }

        let failed_records = self.process_entries(&entries).await;

        if self.config.processing.produce_combined_artifacts {
            self.combine_pending().await?;
        }

        let backups_removed = self.remove_backups().await;

        let summary = RunSummary {
            input_files,
            records: entries.len(),
            failed_records,
            counters: self.counters,
            backups_removed,
            duration_seconds: start.elapsed().as_secs_f64(),
        };
        info!("{}", summary.format_summary());
        if self.config.json_output {
            JsonMessage::complete(summary.clone()).emit();
        }

        Ok(summary)
    }

    /// Returns the number of records that failed
    async fn process_entries(&mut self, entries: &[Value]) -> usize {
        let progress = if self.config.show_progress && !self.config.json_output {
            ProgressManager::new(entries.len() as u64)
        } else {
            ProgressManager::hidden(entries.len() as u64)
        };

        let mut failed = 0;
        for (index, entry) in entries.iter().enumerate() {
            let result = match ManifestRecord::from_value(index, entry) {
                Ok(record) => {
                    progress.set_message(&record.describe());
                    self.process_record(&record)
                        .await
                        .with_context(|| format!("record {}", record.describe()))
                }
                Err(e) => Err(e.into()),
            };

            let record_failed = result.is_err();
            if let Err(e) = result {
                error!("Error processing record #{}: {:#}", index, e);
                failed += 1;
            }

            progress.update(&format!("record #{}", index));
            if self.config.json_output {
                JsonMessage::progress(index + 1, entries.len(), record_failed, self.counters).emit();
            }
        }

        progress.finish(&format!("{} records, {} failed", entries.len(), failed));
        failed
    }

    async fn process_record(&mut self, record: &ManifestRecord) -> Result<()> {
        let outcome = self
            .records
            .process(record, &mut self.resolver, &mut self.counters)
            .await?;

        if let Some(bts) = &outcome.bts {
            debug!("Record {} BTS clip: {}", record.describe(), bts.final_path.display());
        }

        if !self.config.processing.produce_combined_artifacts {
            return Ok(());
        }

        match (outcome.primary, outcome.secondary) {
            (Some(primary), Some(secondary)) => self.pending.push(PendingCombine {
                primary,
                secondary: secondary.final_path,
            }),
            _ => debug!("Record {} has no complete pair to combine", record.describe()),
        }
        Ok(())
    }

    /// Second pass: one combined image per queued pair
    async fn combine_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.combined_output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.config.combined_output_dir.display()))?;

        let pending = std::mem::take(&mut self.pending);
        info!("Creating {} combined images", pending.len());
        for pair in pending {
            if let Err(e) = self.combine_pair(&pair).await {
                error!(
                    "Failed to combine {} image {} with {}: {:#}",
                    pair.primary.role,
                    pair.primary.final_path.display(),
                    pair.secondary.display(),
                    e
                );
            }
        }
        Ok(())
    }

    async fn combine_pair(&mut self, pair: &PendingCombine) -> Result<()> {
        let capture = &pair.primary.capture;
        let timestamp = PathResolver::timestamp_prefix(&pair.primary.final_path)
            .unwrap_or_else(|| filename_timestamp(self.records.zone().to_civil(capture.captured_at)));

        let combined = compositor::combine_files(&pair.primary.final_path, &pair.secondary)?;

        let webp_path = self.resolver.reserve(
            self.config
                .combined_output_dir
                .join(PathResolver::file_name(&timestamp, Role::Combined, None, "webp")),
        );
        ImageProcessor::save_webp(&combined, &webp_path)?;
        self.counters.add_combined();
        info!("Combined image saved: {}", webp_path.display());

        let writer = self.records.metadata_writer();
        writer.apply(&webp_path, capture).await;

        if self.config.processing.convert_to_target_format {
            let jpg_path = self.resolver.reserve(
                self.config
                    .combined_output_dir
                    .join(PathResolver::file_name(&timestamp, Role::Combined, None, "jpg")),
            );
            match self.records.image_processor().save_jpeg(&combined, &jpg_path) {
                Ok(()) => {
                    writer.apply(&jpg_path, capture).await;
                    info!("Combined image converted: {}", jpg_path.display());
                }
                Err(e) => error!("Failed to convert combined image {}: {}", webp_path.display(), e),
            }
        }

        Ok(())
    }

    /// Terminal sweep of `~` backups in both output directories
    async fn remove_backups(&self) -> usize {
        let mut removed = FileManager::remove_backup_files(&self.config.output_dir).await;
        if self.config.processing.produce_combined_artifacts {
            removed += FileManager::remove_backup_files(&self.config.combined_output_dir).await;
        }
        removed
    }
}
