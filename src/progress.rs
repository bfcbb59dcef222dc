//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e i contatori del batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar sui record del manifest
//! - `RunCounters`: contatori monotoni (processed, converted, skipped, combined)
//! - `RunSummary`: riepilogo finale riproducibile dai contatori
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 42/70 (60%) #41 (abc.webp)
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages progress reporting over the manifest records
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_records: u64) -> Self {
        let bar = ProgressBar::new(total_records);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode, tests)
    pub fn hidden(total_records: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_records);
        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Per-run file counters, only ever incremented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub processed: usize,
    pub converted: usize,
    pub skipped: usize,
    pub combined: usize,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_processed(&mut self) {
        self.processed += 1;
    }

    pub fn add_converted(&mut self) {
        self.converted += 1;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_combined(&mut self) {
        self.combined += 1;
    }
}

/// Final report of a batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// WebP files found in the photo stores
    pub input_files: usize,
    pub records: usize,
    pub failed_records: usize,
    #[serde(flatten)]
    pub counters: RunCounters,
    pub backups_removed: usize,
    pub duration_seconds: f64,
}

impl RunSummary {
    pub fn format_summary(&self) -> String {
        format!(
            "Input files: {} | Processed: {} | Converted: {} | Skipped: {} | Combined: {} | Failed records: {}/{}",
            self.input_files,
            self.counters.processed,
            self.counters.converted,
            self.counters.skipped,
            self.counters.combined,
            self.failed_records,
            self.records
        )
    }
}
