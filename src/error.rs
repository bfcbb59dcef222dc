//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ProcessError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Decode`: Immagine o video illeggibile/corrotto
//! - `Encode`: Errore di scrittura o conversione
//! - `MetadataWrite`: Errore di scrittura dei blocchi EXIF/IPTC
//! - `Collaborator`: FFmpeg fallito o non installato
//! - `Filesystem`: File sorgente mancante, permessi, collisioni
//! - `Manifest`: Manifest `posts.json` illeggibile (unico errore fatale)
//!
//! ## Politica di propagazione:
//! Ogni errore viene catturato dalla più piccola unità di lavoro che lo
//! contiene (singola scrittura metadata, singola conversione, singolo record)
//! e loggato con contesto. Nessun errore interrompe il batch, tranne
//! l'apertura/parsing del manifest.
//!
//! ## Esempio:
//! ```rust,ignore
//! if !source.exists() {
//!     return Err(ProcessError::Filesystem(format!("missing {}", source.display())));
//! }
//! ```

/// Custom error types for export processing
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Metadata write error: {0}")]
    MetadataWrite(String),

    #[error("FFmpeg error: {0}")]
    Collaborator(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Manifest error: {0}")]
    Manifest(String),
}

impl From<exif::Error> for ProcessError {
    fn from(err: exif::Error) -> Self {
        ProcessError::MetadataWrite(err.to_string())
    }
}

impl From<img_parts::Error> for ProcessError {
    fn from(err: img_parts::Error) -> Self {
        ProcessError::MetadataWrite(err.to_string())
    }
}

pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
