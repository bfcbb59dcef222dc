//! # Image Processing Module
//!
//! Questo modulo gestisce la conversione dei formati immagine dell'export.
//!
//! ## Responsabilità:
//! - Conversione WebP → JPEG (qualità configurabile, default 80)
//! - Rimozione del canale alpha (baseline fotografica RGB)
//! - Salvataggio WebP lossless delle immagini combinate
//! - Isolamento degli errori: una conversione fallita viene loggata e
//!   segnalata al chiamante, mai propagata oltre il modulo
//!
//! ## Pipeline di conversione:
//! 1. Decodifica sorgente con il crate `image`
//! 2. Conversione a RGB8
//! 3. Encoding JPEG alla qualità configurata
//! 4. In caso di errore: rimozione dell'output parziale
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = ImageProcessor::new(&config);
//! if let Some(jpg) = processor.convert(&webp_path, &jpg_path) {
//!     // continua con i metadata
//! }
//! ```

use crate::config::Config;
use crate::error::{ProcessError, ProcessResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Converts export images between raster formats
pub struct ImageProcessor {
    /// JPEG quality (1-100)
    jpeg_quality: u8,
}

impl ImageProcessor {
    pub fn new(config: &Config) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Only WebP sources are re-encoded
    pub fn needs_conversion(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("webp"))
            .unwrap_or(false)
    }

    /// Convert `input` to a JPEG at `output`; `None` means the conversion failed and was logged
    pub fn convert(&self, input: &Path, output: &Path) -> Option<PathBuf> {
        match self.convert_to_jpeg(input, output) {
            Ok(()) => {
                info!("Converted {} to JPEG", input.display());
                Some(output.to_path_buf())
            }
            Err(e) => {
                error!("Error converting {} to JPEG: {}", input.display(), e);
                if output.exists() {
                    let _ = std::fs::remove_file(output);
                }
                None
            }
        }
    }

    /// Decode, drop alpha and re-encode as JPEG
    pub fn convert_to_jpeg(&self, input: &Path, output: &Path) -> ProcessResult<()> {
        let decoded = image::open(input)
            .map_err(|e| ProcessError::Decode(format!("{}: {}", input.display(), e)))?;
        debug!(
            "Decoded {} ({}x{}), encoding at quality {}",
            input.display(),
            decoded.width(),
            decoded.height(),
            self.jpeg_quality
        );

        self.save_jpeg(&decoded, output)
    }

    pub fn save_jpeg(&self, image: &DynamicImage, output: &Path) -> ProcessResult<()> {
        let mut writer = BufWriter::new(File::create(output)?);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality))
            .map_err(|e| ProcessError::Encode(format!("{}: {}", output.display(), e)))?;
        writer.flush()?;
        Ok(())
    }

    /// Lossless WebP, used for combined images
    pub fn save_webp(image: &DynamicImage, output: &Path) -> ProcessResult<()> {
        let mut writer = BufWriter::new(File::create(output)?);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut writer))
            .map_err(|e| ProcessError::Encode(format!("{}: {}", output.display(), e)))?;
        writer.flush()?;
        Ok(())
    }
}
