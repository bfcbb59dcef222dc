//! # Path Resolution Module
//!
//! Centralizza il calcolo dei nomi di output:
//! `{timestamp}_{ruolo}[_{nome originale}].{estensione}` con deduplicazione
//! `_1`, `_2`, ... quando il percorso è già occupato.

use crate::config::ProcessingConfig;
use crate::image_processor::ImageProcessor;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which part of a post an output file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Secondary,
    Bts,
    Combined,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
            Role::Bts => "bts",
            Role::Combined => "combined",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives collision-free output paths for one run
#[derive(Debug, Default)]
pub struct PathResolver {
    /// Every path handed out so far
    reserved: HashSet<PathBuf>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{timestamp}_{role}[_{original_stem}].{extension}`
    pub fn file_name(timestamp: &str, role: Role, original_stem: Option<&str>, extension: &str) -> String {
        match original_stem {
            Some(stem) => format!("{}_{}_{}.{}", timestamp, role, stem, extension),
            None => format!("{}_{}.{}", timestamp, role, extension),
        }
    }

    /// Target extension for an image source
    pub fn image_extension(source: &Path, processing: &ProcessingConfig) -> String {
        if processing.convert_to_target_format && ImageProcessor::needs_conversion(source) {
            "jpg".to_string()
        } else {
            source
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "jpg".to_string())
        }
    }

    /// Derive and reserve the output path of `source` in `output_dir`
    pub fn derive(
        &mut self,
        output_dir: &Path,
        timestamp: &str,
        role: Role,
        source: &Path,
        extension: &str,
        processing: &ProcessingConfig,
    ) -> PathBuf {
        let stem = source.file_stem().map(|s| s.to_string_lossy());
        let original_stem = stem.as_deref().filter(|_| processing.preserve_original_name);
        let candidate = output_dir.join(Self::file_name(timestamp, role, original_stem, extension));
        self.reserve(candidate)
    }

    /// First free variant of `candidate`, reserved for this run
    pub fn reserve(&mut self, candidate: PathBuf) -> PathBuf {
        let path = self.unique_path(&candidate);
        if path != candidate {
            debug!("{} is taken, using {}", candidate.display(), path.display());
        }
        self.reserved.insert(path.clone());
        path
    }

    /// `candidate` itself, or `{stem}_{n}.{ext}` with the smallest free `n`
    pub fn unique_path(&self, candidate: &Path) -> PathBuf {
        if !self.is_taken(candidate) {
            return candidate.to_path_buf();
        }

        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = candidate
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        (1u64..)
            .map(|counter| candidate.with_file_name(format!("{}_{}{}", stem, counter, suffix)))
            .find(|path| !self.is_taken(path))
            .unwrap_or_else(|| candidate.to_path_buf())
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.reserved.contains(path) || path.exists()
    }

    /// Leading `{timestamp}` of a derived file name
    pub fn timestamp_prefix(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy();
        stem.split('_').next().filter(|s| !s.is_empty()).map(str::to_string)
    }
}
