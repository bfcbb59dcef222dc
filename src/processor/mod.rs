//! # Processor Module
//!
//! Separa le responsabilità del batch in sottomoduli:
//! - `batch_processor`: orchestratore principale e passaggio combinato
//! - `record_processor`: worker per il singolo record
//! - `path_resolver`: nomi di output e deduplicazione

pub mod batch_processor;
pub mod path_resolver;
pub mod record_processor;

pub use batch_processor::BatchProcessor;
pub use path_resolver::{PathResolver, Role};
pub use record_processor::{OutputArtifact, RecordOutcome, RecordProcessor};
