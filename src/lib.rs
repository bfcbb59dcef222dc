//! # BeReal Export Processor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `config`: configurazione del batch e validazione parametri
//! - `error`: tipi di errore custom
//! - `manifest`: lettura di `posts.json`
//! - `time`: ora civile per i metadata (CET/CEST)
//! - `geo`: coordinate in gradi/minuti/secondi e ISO 6709
//! - `image_processor`: conversione WebP → JPEG
//! - `metadata`: blocchi EXIF e IPTC nelle foto
//! - `video_processor`: tag di container dei video BTS tramite FFmpeg
//! - `compositor`: immagine combinata principale + secondaria
//! - `processor`: orchestratore del batch, worker per record, nomi di output
//! - `file_manager`: ricerca, copia e pulizia dei file
//! - `progress`: progress bar, contatori e riepilogo
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use bereal_export_processor::{BatchProcessor, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let summary = BatchProcessor::new(config).run().await?;
//! println!("{}", summary.format_summary());
//! # Ok(())
//! # }
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod geo;
pub mod image_processor;
pub mod json_output;
pub mod manifest;
pub mod metadata;
pub mod platform;
pub mod processor;
pub mod progress;
pub mod time;
pub mod utils;
pub mod video_processor;

pub use config::{Config, ProcessingConfig};
pub use error::{ProcessError, ProcessResult};
pub use processor::BatchProcessor;
pub use progress::{RunCounters, RunSummary};
