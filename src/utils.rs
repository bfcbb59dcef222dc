//! # Utility Functions Module
//!
//! Helpers for building argument vectors of external commands.

/// Macro for convenient argument building.
///
/// Each item is converted with `OsString::from`, so `&str`, `String`,
/// `&Path` and `&OsStr` can be mixed in one list and non-UTF-8 file names
/// reach the external process intact.
///
/// # Example
/// ```rust
/// use bereal_export_processor::args;
/// use std::path::Path;
///
/// let input = Path::new("clip.mp4");
/// let args = args!["-i", input, "-c", "copy"];
/// assert_eq!(args.len(), 4);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::ffi::OsString::from($item)),*]
    };
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::Path;

    #[test]
    fn test_args_macro_mixes_paths_and_strings() {
        let input = Path::new("in put.mp4");
        let tag = format!("creation_time={}", "2024-07-15T12:00:00Z");
        let result = args!["-i", input, "-metadata", tag];
        assert_eq!(
            result,
            vec![
                OsString::from("-i"),
                OsString::from("in put.mp4"),
                OsString::from("-metadata"),
                OsString::from("creation_time=2024-07-15T12:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_args_macro_empty() {
        let result: Vec<OsString> = args![];
        assert!(result.is_empty());
    }
}
