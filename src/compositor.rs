//! # Image Compositor Module
//!
//! Crea l'immagine combinata in stile "memories": la foto secondaria
//! rimpicciolita e con angoli arrotondati sopra la foto principale.
//!
//! ## Geometria (pixel):
//! - Secondaria scalata a 1/3.33333333 delle dimensioni originali (Lanczos3)
//! - Angoli arrotondati con raggio 60
//! - Posizionata a (55, 55)
//! - Bordo nero di 7 px attorno, raggio 60 + 7
//!
//! ## Pipeline:
//! 1. Resize secondaria (larghezza/altezza troncate)
//! 2. Maschera rettangolo arrotondato come canale alpha
//! 3. Canvas = copia della principale
//! 4. Layer trasparente con il bordo nero, composto sul canvas
//! 5. Secondaria composta sopra alla posizione fissa
//!
//! L'output ha sempre le dimensioni della principale.

use crate::error::{ProcessError, ProcessResult};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

pub const CORNER_RADIUS: u32 = 60;
pub const OUTLINE_SIZE: u32 = 7;
pub const INSET_POSITION: (u32, u32) = (55, 55);
pub const SCALING_FACTOR: f64 = 1.0 / 3.33333333;

/// Half-open pixel box `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelBox {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelBox {
    /// Whether the centre of pixel `(x, y)` lies in the box with rounded corners
    fn contains_rounded(&self, x: i64, y: i64, radius: u32) -> bool {
        if x < self.x0 || x >= self.x1 || y < self.y0 || y >= self.y1 {
            return false;
        }
        let width = (self.x1 - self.x0) as f64;
        let height = (self.y1 - self.y0) as f64;
        let r = (radius as f64).min(width / 2.0).min(height / 2.0);

        let cx = x as f64 + 0.5;
        let cy = y as f64 + 0.5;
        let dx = (self.x0 as f64 + r - cx).max(cx - (self.x1 as f64 - r)).max(0.0);
        let dy = (self.y0 as f64 + r - cy).max(cy - (self.y1 as f64 - r)).max(0.0);
        dx * dx + dy * dy <= r * r
    }
}

/// Load both images and combine them
pub fn combine_files(primary: &Path, secondary: &Path) -> ProcessResult<DynamicImage> {
    let primary_image = image::open(primary)
        .map_err(|e| ProcessError::Decode(format!("{}: {}", primary.display(), e)))?;
    let secondary_image = image::open(secondary)
        .map_err(|e| ProcessError::Decode(format!("{}: {}", secondary.display(), e)))?;
    Ok(combine(&primary_image, &secondary_image))
}

/// Layer the rounded, outlined secondary image over the primary one
pub fn combine(primary: &DynamicImage, secondary: &DynamicImage) -> DynamicImage {
    let new_width = ((secondary.width() as f64 * SCALING_FACTOR) as u32).max(1);
    let new_height = ((secondary.height() as f64 * SCALING_FACTOR) as u32).max(1);
    debug!(
        "Resizing secondary {}x{} -> {}x{}",
        secondary.width(),
        secondary.height(),
        new_width,
        new_height
    );

    let mut inset = imageops::resize(&secondary.to_rgba8(), new_width, new_height, FilterType::Lanczos3);
    let mask_box = PixelBox {
        x0: 0,
        y0: 0,
        x1: new_width as i64,
        y1: new_height as i64,
    };
    for (x, y, pixel) in inset.enumerate_pixels_mut() {
        pixel[3] = if mask_box.contains_rounded(x as i64, y as i64, CORNER_RADIUS) { 255 } else { 0 };
    }

    let mut canvas = primary.to_rgba8();
    let outline = outline_layer(canvas.width(), canvas.height(), new_width, new_height);
    imageops::overlay(&mut canvas, &outline, 0, 0);
    imageops::overlay(
        &mut canvas,
        &inset,
        INSET_POSITION.0 as i64,
        INSET_POSITION.1 as i64,
    );

    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Transparent canvas-sized layer holding the black frame behind the inset
fn outline_layer(width: u32, height: u32, inset_width: u32, inset_height: u32) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    let (px, py) = (INSET_POSITION.0 as i64, INSET_POSITION.1 as i64);
    let margin = OUTLINE_SIZE as i64;
    let frame = PixelBox {
        x0: px - margin,
        y0: py - margin,
        x1: px + inset_width as i64 + margin,
        y1: py + inset_height as i64 + margin,
    };

    let black = Rgba([0, 0, 0, 255]);
    for y in frame.y0.max(0)..frame.y1.min(height as i64) {
        for x in frame.x0.max(0)..frame.x1.min(width as i64) {
            if frame.contains_rounded(x, y, CORNER_RADIUS + OUTLINE_SIZE) {
                layer.put_pixel(x as u32, y as u32, black);
            }
        }
    }
    layer
}
