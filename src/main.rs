//! # BeReal Export Processor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON opzionale + flag CLI)
//! - Avvio del batch processor
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` ha la precedenza)
//! 3. Carica la configurazione e applica i flag
//! 4. Valida la configurazione (ed eventualmente la salva con `--save-config`)
//! 5. Esegue il batch e stampa il riepilogo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! bereal-processor --data-dir ./export --output out/__processed --no-combine --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use bereal_export_processor::json_output::JsonMessage;
use bereal_export_processor::platform::PlatformCommands;
use bereal_export_processor::video_processor::VideoProcessor;
use bereal_export_processor::{BatchProcessor, Config};

#[derive(Parser)]
#[command(name = "bereal-processor")]
#[command(about = "Rename, tag and combine the photos and clips of a BeReal export")]
struct Args {
    /// Root of the unpacked export (contains posts.json and Photos/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output directory for single images and BTS clips
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory for combined images
    #[arg(long)]
    combined_output: Option<PathBuf>,

    /// Keep WebP photos instead of converting them to JPEG
    #[arg(long)]
    no_convert: bool,

    /// Append the original file name to the renamed file
    #[arg(short, long)]
    keep_original_name: bool,

    /// Do not create combined images
    #[arg(long)]
    no_combine: bool,

    /// JPEG quality (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// IANA timezone for the capture time written into photos
    #[arg(long)]
    timezone: Option<String>,

    /// JSON configuration file (flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file before running
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Emit machine-readable JSON messages on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    async fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .await
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(combined_output) = self.combined_output {
            config.combined_output_dir = combined_output;
        }
        if self.no_convert {
            config.processing.convert_to_target_format = false;
        }
        if self.keep_original_name {
            config.processing.preserve_original_name = true;
        }
        if self.no_combine {
            config.processing.produce_combined_artifacts = false;
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        if self.ffmpeg.is_some() {
            config.ffmpeg_path = self.ffmpeg;
        }
        if let Some(timezone) = self.timezone {
            config.timezone = timezone;
        }
        if self.json {
            config.json_output = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Running on {}", PlatformCommands::system_info());

    let save_config = args.save_config.clone();
    let config = args.into_config().await?;

    if let Some(path) = save_config {
        config
            .save_to_file(&path)
            .await
            .with_context(|| format!("Failed to save configuration {}", path.display()))?;
        info!("Configuration saved to {}", path.display());
    }

    if !config.data_dir.is_dir() {
        return Err(anyhow::anyhow!("Data directory does not exist: {}", config.data_dir.display()));
    }

    let ffmpeg = VideoProcessor::new(&config).ffmpeg().to_path_buf();
    if !PlatformCommands::instance().is_command_available(&ffmpeg).await {
        warn!(
            "{} not found: BTS videos will be copied without metadata",
            ffmpeg.display()
        );
    }

    let json_output = config.json_output;
    let mut processor = BatchProcessor::new(config);
    match processor.run().await {
        Ok(summary) => {
            info!("Processing completed in {:.1}s", summary.duration_seconds);
            Ok(())
        }
        Err(e) => {
            if json_output {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            }
            Err(e)
        }
    }
}
