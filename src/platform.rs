//! # Platform-specific utilities
//!
//! Risoluzione cross-platform del collaboratore esterno `ffmpeg`
//! (nome eseguibile, override da configurazione, verifica disponibilità).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Platform-specific command manager
pub struct PlatformCommands {
    ffmpeg: &'static str,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        if cfg!(windows) {
            Self { ffmpeg: "ffmpeg.exe", which_command: "where" }
        } else {
            Self { ffmpeg: "ffmpeg", which_command: "which" }
        }
    }

    /// Platform executable name of ffmpeg
    pub fn ffmpeg_command(&self) -> &'static str {
        self.ffmpeg
    }

    /// Explicit override first, then the platform name looked up on PATH
    pub fn resolve_ffmpeg(&self, override_path: Option<&Path>) -> PathBuf {
        match override_path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(self.ffmpeg),
        }
    }

    /// Check if an executable can be found
    pub async fn is_command_available(&self, command: &Path) -> bool {
        if command.components().count() > 1 {
            return command.is_file();
        }

        let result = tokio::process::Command::new(self.which_command)
            .arg(command)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_command_name() {
        let ffmpeg = PlatformCommands::instance().ffmpeg_command();
        if cfg!(windows) {
            assert_eq!(ffmpeg, "ffmpeg.exe");
        } else {
            assert_eq!(ffmpeg, "ffmpeg");
        }
    }

    #[test]
    fn test_resolve_ffmpeg_prefers_override() {
        let platform = PlatformCommands::instance();
        let custom = Path::new("/opt/ffmpeg/bin/ffmpeg");

        assert_eq!(platform.resolve_ffmpeg(Some(custom)), custom.to_path_buf());
        assert_eq!(platform.resolve_ffmpeg(None), PathBuf::from(platform.ffmpeg_command()));
    }

    #[tokio::test]
    async fn test_missing_explicit_path_is_unavailable() {
        let platform = PlatformCommands::instance();
        let missing = Path::new("/definitely/not/here/ffmpeg");
        assert!(!platform.is_command_available(missing).await);
    }

    #[test]
    fn test_system_info() {
        let info = PlatformCommands::system_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(!info.family.is_empty());
    }
}
