//! # File Management Module
//!
//! Operazioni sul filesystem dell'export e delle cartelle di output.
//!
//! ## Responsabilità:
//! - Ricerca di un file sorgente nelle cartelle candidate (formato attuale
//!   `Photos/post`, poi formato legacy `Photos/bereal`)
//! - Conteggio dei file di input per estensione (solo primo livello)
//! - Copia e spostamento con creazione delle cartelle di destinazione
//! - Pulizia finale dei backup `*~` lasciati dal writer dei metadata
//!
//! ## Esempio:
//! ```rust,ignore
//! let stores = [config.photo_dir(), config.legacy_photo_dir()];
//! match FileManager::locate(&record.primary_path, &stores) {
//!     Some(source) => { /* process */ }
//!     None => warn!("missing"),
//! }
//! ```

use crate::metadata::BACKUP_MARKER;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// First existing `<store>/<file name of manifest_path>`
    pub fn locate(manifest_path: &Path, stores: &[PathBuf]) -> Option<PathBuf> {
        let file_name = manifest_path.file_name()?;
        stores
            .iter()
            .map(|store| store.join(file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Count files with `extension` directly inside `dir` (0 if it does not exist)
    pub fn count_files_with_extension(dir: &Path, extension: &str) -> usize {
        if !dir.is_dir() {
            return 0;
        }

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| Self::has_extension(e.path(), extension))
            .count()
    }

    /// Case-insensitive extension check
    pub fn has_extension(path: &Path, extension: &str) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }

    /// Copy a file, creating the destination directory if needed
    pub async fn copy_file(source: &Path, destination: &Path) -> Result<()> {
        Self::ensure_parent_dirs(destination).await?;
        fs::copy(source, destination)
            .await
            .with_context(|| format!("Failed to copy {} to {}", source.display(), destination.display()))?;
        Ok(())
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directories for {}", path.display()))?;
        }
        Ok(())
    }

    pub fn is_backup_file(path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(BACKUP_MARKER))
            .unwrap_or(false)
    }

    /// Delete backup files directly inside `dir`, returning how many were removed
    pub async fn remove_backup_files(dir: &Path) -> usize {
        if !dir.is_dir() {
            debug!("No backup sweep for missing directory {}", dir.display());
            return 0;
        }

        let backups: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Self::is_backup_file(e.path()))
            .map(|e| e.into_path())
            .collect();

        let mut removed = 0;
        for backup in backups {
            match fs::remove_file(&backup).await {
                Ok(()) => {
                    debug!("Removed backup file: {}", backup.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove backup file {}: {}", backup.display(), e),
            }
        }

        if removed > 0 {
            info!("Removed {} backup files from {}", removed, dir.display());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_prefers_current_store() {
        let temp_dir = TempDir::new().unwrap();
        let current = temp_dir.path().join("Photos/post");
        let legacy = temp_dir.path().join("Photos/bereal");
        std::fs::create_dir_all(&current).unwrap();
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(current.join("a.webp"), b"a").unwrap();
        std::fs::write(legacy.join("a.webp"), b"a").unwrap();
        std::fs::write(legacy.join("b.webp"), b"b").unwrap();

        let stores = [current.clone(), legacy.clone()];
        assert_eq!(
            FileManager::locate(Path::new("/Photos/post/a.webp"), &stores),
            Some(current.join("a.webp"))
        );
        assert_eq!(
            FileManager::locate(Path::new("/Photos/bereal/b.webp"), &stores),
            Some(legacy.join("b.webp"))
        );
        assert_eq!(FileManager::locate(Path::new("/Photos/post/c.webp"), &stores), None);
    }

    #[test]
    fn test_count_files_with_extension() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("a.webp"), b"").unwrap();
        std::fs::write(dir.join("b.WEBP"), b"").unwrap();
        std::fs::write(dir.join("c.jpg"), b"").unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/d.webp"), b"").unwrap();

        assert_eq!(FileManager::count_files_with_extension(dir, "webp"), 2);
        assert_eq!(FileManager::count_files_with_extension(&dir.join("missing"), "webp"), 0);
    }

    #[tokio::test]
    async fn test_copy_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("clip.mp4");
        let destination = temp_dir.path().join("out/deep/clip.mp4");
        fs::write(&source, b"video bytes").await.unwrap();

        FileManager::copy_file(&source, &destination).await.unwrap();
        assert_eq!(fs::read(&destination).await.unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn test_remove_backup_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("a.jpg"), b"").unwrap();
        std::fs::write(dir.join("a.jpg~"), b"").unwrap();
        std::fs::write(dir.join("b.webp~"), b"").unwrap();
        std::fs::write(dir.join("c~d.jpg"), b"").unwrap();

        assert_eq!(FileManager::remove_backup_files(dir).await, 2);
        assert!(dir.join("a.jpg").exists());
        assert!(dir.join("c~d.jpg").exists());
        assert!(!dir.join("a.jpg~").exists());
        assert_eq!(FileManager::remove_backup_files(&dir.join("missing")).await, 0);
    }
}
