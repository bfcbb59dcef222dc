//! # Photo Metadata Module
//!
//! Scrittura e lettura dei metadata incorporati nelle immagini.
//!
//! ## Responsabilità:
//! - Blocco EXIF: data di scatto (ora civile), GPS, titolo (`ImageDescription`)
//! - Blocco IPTC (solo JPEG): Caption-Abstract, Source, Originating Program
//! - I due blocchi sono standard diversi nello stesso file e vengono
//!   aggiornati in modo indipendente: il fallimento di uno non blocca l'altro
//! - Backup `<file>~` prima della riscrittura (rimosso a fine batch)
//!
//! ## Contenitori supportati:
//! | Formato | EXIF | IPTC |
//! |---------|------|------|
//! | JPEG    | APP1 | APP13 (Photoshop 3.0 / 8BIM 0x0404) |
//! | WebP    | chunk `EXIF` (layout esteso `VP8X`) | non definito, saltato |
//!
//! ## Esempio:
//! ```rust,ignore
//! let writer = PhotoMetadataWriter::new(CivilZone::default());
//! let report = writer.apply(&path, &capture).await;
//! ```

pub mod exif_block;
pub mod iptc;
pub mod webp;

use crate::error::{ProcessError, ProcessResult};
use crate::geo::GeoPoint;
use crate::time::{exif_datetime, CivilZone};
use chrono::{DateTime, Utc};
use exif::Tag;
use exif_block::{ascii_value, rational_values, ExifFields};
use img_parts::jpeg::JpegSegment;
use img_parts::{Bytes, DynImage, ImageEXIF};
use iptc::{IptcRecord, PhotoshopResources, CAPTION_ABSTRACT, ORIGINATING_PROGRAM, PHOTOSHOP_SIGNATURE, SOURCE};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

pub const SOURCE_APP: &str = "BeReal app";
pub const PROCESSING_TOOL: &str = env!("CARGO_PKG_NAME");

/// Suffix of the copies kept while a file is rewritten
pub const BACKUP_MARKER: char = '~';

const APP0: u8 = 0xE0;
const APP12: u8 = 0xEC;
const APP13: u8 = 0xED;

const CAPTION_MAX_LEN: usize = 2000;
const SHORT_TEXT_MAX_LEN: usize = 32;

/// What a record says about the moment it was captured
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInfo {
    pub captured_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub caption: Option<String>,
}

/// Outcome of a best-effort metadata pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub exif_written: bool,
    pub iptc_written: bool,
}

/// Metadata read back from an image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    pub date_time_original: Option<String>,
    pub description: Option<String>,
    pub latitude_ref: Option<String>,
    pub latitude: Option<Vec<(u32, u32)>>,
    pub longitude_ref: Option<String>,
    pub longitude: Option<Vec<(u32, u32)>>,
    pub caption_abstract: Option<String>,
    pub source: Option<String>,
    pub originating_program: Option<String>,
}

/// Writes EXIF and IPTC blocks into photos
pub struct PhotoMetadataWriter {
    zone: CivilZone,
}

impl PhotoMetadataWriter {
    pub fn new(zone: CivilZone) -> Self {
        Self { zone }
    }

    /// Update both blocks in place, logging failures instead of returning them
    pub async fn apply(&self, path: &Path, capture: &CaptureInfo) -> WriteReport {
        if let Err(e) = fs::copy(path, backup_path(path)).await {
            warn!("Could not back up {} before writing metadata: {}", path.display(), e);
        }

        let exif_written = match self.write_exif(path, capture).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update EXIF data for {}: {}", path.display(), e);
                false
            }
        };

        let iptc_written = match self.write_iptc(path, capture.caption.as_deref()).await {
            Ok(written) => written,
            Err(e) => {
                error!("Failed to update IPTC Caption-Abstract for {}: {}", path.display(), e);
                false
            }
        };

        WriteReport { exif_written, iptc_written }
    }

    /// Capture date, GPS position and title into the EXIF block
    pub async fn write_exif(&self, path: &Path, capture: &CaptureInfo) -> ProcessResult<()> {
        let mut image = load_container(path).await?;
        let mut fields = ExifFields::from_raw(image.exif().map(|b| b.to_vec()));

        let civil = exif_datetime(self.zone.to_civil(capture.captured_at));
        debug!(
            "Capture time {} (UTC) stored as {}",
            capture.captured_at.format("%Y:%m:%d %H:%M:%S"),
            civil
        );
        fields.set_ascii(Tag::DateTimeOriginal, &civil);

        if let Some(location) = &capture.location {
            debug!("Adding GPS location {}", location);
            fields.set_gps(location);
        }

        if let Some(caption) = &capture.caption {
            debug!("Adding title from caption: {}", caption);
            fields.set_ascii(Tag::ImageDescription, caption);
        }

        image.set_exif(Some(Bytes::from(fields.encode()?)));
        save_container(path, image).await?;
        info!("Updated EXIF data for {}", path.display());
        Ok(())
    }

    /// Caption and provenance into the IPTC block; `Ok(false)` for non-JPEG files
    pub async fn write_iptc(&self, path: &Path, caption: Option<&str>) -> ProcessResult<bool> {
        let mut image = load_container(path).await?;
        let DynImage::Jpeg(jpeg) = &mut image else {
            debug!("Skipping IPTC for non-JPEG file {}", path.display());
            return Ok(false);
        };

        let segments = jpeg.segments_mut();
        let existing = segments
            .iter()
            .position(|s| s.marker() == APP13 && s.contents().starts_with(PHOTOSHOP_SIGNATURE));

        let mut resources = match existing {
            Some(index) => PhotoshopResources::parse(segments[index].contents())?,
            None => PhotoshopResources::default(),
        };
        let mut record: IptcRecord = resources.iptc()?;

        if let Some(caption) = caption {
            record.set_text(CAPTION_ABSTRACT, caption, CAPTION_MAX_LEN);
        }
        record.set_text(SOURCE, SOURCE_APP, SHORT_TEXT_MAX_LEN);
        record.set_text(ORIGINATING_PROGRAM, PROCESSING_TOOL, SHORT_TEXT_MAX_LEN);
        record.declare_utf8();
        resources.set_iptc(&record);

        let segment = JpegSegment::new_with_contents(APP13, Bytes::from(resources.encode()));
        match existing {
            Some(index) => segments[index] = segment,
            None => {
                let position = segments
                    .iter()
                    .take_while(|s| (APP0..=APP12).contains(&s.marker()))
                    .count();
                segments.insert(position, segment);
            }
        }

        save_container(path, image).await?;
        info!("Updated IPTC Caption-Abstract for {}", path.display());
        Ok(true)
    }
}

/// Read the EXIF and IPTC fields this crate writes
pub async fn read_photo_metadata(path: &Path) -> ProcessResult<EmbeddedMetadata> {
    let image = load_container(path).await?;
    let fields = ExifFields::from_raw(image.exif().map(|b| b.to_vec()));

    let mut metadata = EmbeddedMetadata {
        date_time_original: fields.get(Tag::DateTimeOriginal).and_then(ascii_value),
        description: fields.get(Tag::ImageDescription).and_then(ascii_value),
        latitude_ref: fields.get(Tag::GPSLatitudeRef).and_then(ascii_value),
        latitude: fields.get(Tag::GPSLatitude).and_then(rational_values),
        longitude_ref: fields.get(Tag::GPSLongitudeRef).and_then(ascii_value),
        longitude: fields.get(Tag::GPSLongitude).and_then(rational_values),
        ..Default::default()
    };

    if let DynImage::Jpeg(jpeg) = &image {
        let app13 = jpeg
            .segments()
            .iter()
            .find(|s| s.marker() == APP13 && s.contents().starts_with(PHOTOSHOP_SIGNATURE));
        if let Some(segment) = app13 {
            let record = PhotoshopResources::parse(segment.contents())?.iptc()?;
            metadata.caption_abstract = record.get_text(CAPTION_ABSTRACT);
            metadata.source = record.get_text(SOURCE);
            metadata.originating_program = record.get_text(ORIGINATING_PROGRAM);
        }
    }

    Ok(metadata)
}

/// `<path>~`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_MARKER.to_string());
    PathBuf::from(name)
}

async fn load_container(path: &Path) -> ProcessResult<DynImage> {
    let data = fs::read(path).await?;
    DynImage::from_bytes(Bytes::from(data))?.ok_or_else(|| {
        ProcessError::MetadataWrite(format!("unsupported image container: {}", path.display()))
    })
}

async fn save_container(path: &Path, image: DynImage) -> ProcessResult<()> {
    let is_webp = matches!(image, DynImage::WebP(_));
    let mut out = Vec::new();
    image.encoder().write_to(&mut out)?;
    if is_webp {
        out = webp::ensure_extended(&out)?;
    }
    fs::write(path, out).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use exif::In;
    use image::{Rgb, RgbImage};
    use std::io::BufReader;
    use tempfile::TempDir;

    fn paris_capture(caption: Option<&str>) -> CaptureInfo {
        CaptureInfo {
            captured_at: Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap(),
            location: Some(GeoPoint::new(48.8566, 2.3522)),
            caption: caption.map(str::to_string),
        }
    }

    fn write_fixture(dir: &Path, name: &str, format: image::ImageFormat) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(16, 12, Rgb([200, 120, 40]))
            .save_with_format(&path, format)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_caption_round_trip_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "photo.jpg", image::ImageFormat::Jpeg);

        let writer = PhotoMetadataWriter::new(CivilZone::default());
        let report = writer.apply(&path, &paris_capture(Some("hello"))).await;
        assert_eq!(report, WriteReport { exif_written: true, iptc_written: true });

        let metadata = read_photo_metadata(&path).await.unwrap();
        assert_eq!(metadata.description.as_deref(), Some("hello"));
        assert_eq!(metadata.caption_abstract.as_deref(), Some("hello"));
        assert_eq!(metadata.source.as_deref(), Some(SOURCE_APP));
        assert_eq!(metadata.originating_program.as_deref(), Some(PROCESSING_TOOL));
        assert_eq!(metadata.date_time_original.as_deref(), Some("2024:07:15 14:00:00"));
        assert_eq!(metadata.latitude_ref.as_deref(), Some("N"));
        assert_eq!(metadata.longitude_ref.as_deref(), Some("E"));
        assert_eq!(metadata.latitude, Some(vec![(48, 1), (51, 1), (2376, 100)]));

        // Still a decodable JPEG
        assert!(image::open(&path).is_ok());
    }

    #[tokio::test]
    async fn test_exif_round_trip_webp() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "photo.webp", image::ImageFormat::WebP);

        let writer = PhotoMetadataWriter::new(CivilZone::default());
        let report = writer.apply(&path, &paris_capture(Some("Paris"))).await;
        assert_eq!(report, WriteReport { exif_written: true, iptc_written: false });

        let metadata = read_photo_metadata(&path).await.unwrap();
        assert_eq!(metadata.date_time_original.as_deref(), Some("2024:07:15 14:00:00"));
        assert_eq!(metadata.description.as_deref(), Some("Paris"));
        assert_eq!(metadata.latitude_ref.as_deref(), Some("N"));
        assert_eq!(metadata.latitude, Some(vec![(48, 1), (51, 1), (2376, 100)]));
        assert_eq!(metadata.longitude, Some(vec![(2, 1), (21, 1), (792, 100)]));
        assert_eq!(metadata.caption_abstract, None);

        // Visible to an independent reader through the VP8X header
        let file = std::fs::File::open(&path).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .unwrap();
        let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY).unwrap();
        assert_eq!(ascii_value(&field.value).as_deref(), Some("2024:07:15 14:00:00"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[12..16], b"VP8X");

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 12));
    }

    #[tokio::test]
    async fn test_absent_fields_are_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "photo.jpg", image::ImageFormat::Jpeg);

        let capture = CaptureInfo {
            location: None,
            ..paris_capture(None)
        };
        PhotoMetadataWriter::new(CivilZone::default()).apply(&path, &capture).await;

        let metadata = read_photo_metadata(&path).await.unwrap();
        assert!(metadata.date_time_original.is_some());
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.latitude, None);
        assert_eq!(metadata.caption_abstract, None);
        assert_eq!(metadata.source.as_deref(), Some(SOURCE_APP));
    }

    #[tokio::test]
    async fn test_rewrite_keeps_single_iptc_segment() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "photo.jpg", image::ImageFormat::Jpeg);
        let writer = PhotoMetadataWriter::new(CivilZone::default());

        writer.apply(&path, &paris_capture(Some("first"))).await;
        writer.apply(&path, &paris_capture(Some("second"))).await;

        let metadata = read_photo_metadata(&path).await.unwrap();
        assert_eq!(metadata.caption_abstract.as_deref(), Some("second"));
        assert_eq!(metadata.description.as_deref(), Some("second"));

        let bytes = std::fs::read(&path).unwrap();
        let jpeg = img_parts::jpeg::Jpeg::from_bytes(Bytes::from(bytes)).unwrap();
        let app13_count = jpeg.segments().iter().filter(|s| s.marker() == APP13).count();
        assert_eq!(app13_count, 1);
    }

    #[tokio::test]
    async fn test_backup_is_left_next_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "photo.jpg", image::ImageFormat::Jpeg);

        PhotoMetadataWriter::new(CivilZone::default()).apply(&path, &paris_capture(None)).await;
        assert!(temp_dir.path().join("photo.jpg~").exists());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let report = PhotoMetadataWriter::new(CivilZone::default())
            .apply(&path, &paris_capture(Some("x")))
            .await;
        assert_eq!(report, WriteReport::default());
        assert_eq!(std::fs::read(&path).unwrap(), b"definitely not an image");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(backup_path(Path::new("/out/a.jpg")), PathBuf::from("/out/a.jpg~"));
    }
}
