//! EXIF block encoding on top of `kamadak-exif`.
//!
//! Existing fields are carried over, except the IFD pointers and strip or
//! thumbnail offsets that the writer regenerates or cannot relocate.

use crate::error::ProcessResult;
use crate::geo::GeoPoint;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use std::io::Cursor;
use tracing::warn;

/// Tags rebuilt by the writer or tied to byte offsets in the old block
const SKIPPED_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
];

/// Decoded primary-IFD fields of an EXIF block
#[derive(Debug, Default)]
pub struct ExifFields {
    fields: Vec<Field>,
}

impl ExifFields {
    /// Parse a raw TIFF-structured EXIF block; a corrupt block yields an empty set
    pub fn from_raw(raw: Option<Vec<u8>>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match exif::Reader::new().read_raw(raw) {
            Ok(parsed) => {
                let fields = parsed
                    .fields()
                    .filter(|f| f.ifd_num == In::PRIMARY)
                    .filter(|f| !SKIPPED_TAGS.contains(&f.tag))
                    .filter(|f| !matches!(f.value, Value::Unknown(..)))
                    .cloned()
                    .collect();
                Self { fields }
            }
            Err(e) => {
                warn!("Discarding unreadable EXIF block: {}", e);
                Self::default()
            }
        }
    }

    pub fn get(&self, tag: Tag) -> Option<&Value> {
        self.fields.iter().find(|f| f.tag == tag).map(|f| &f.value)
    }

    pub fn set(&mut self, tag: Tag, value: Value) {
        self.fields.retain(|f| f.tag != tag);
        self.fields.push(Field { tag, ifd_num: In::PRIMARY, value });
    }

    pub fn set_ascii(&mut self, tag: Tag, text: &str) {
        self.set(tag, Value::Ascii(vec![text.as_bytes().to_vec()]));
    }

    pub fn set_gps(&mut self, point: &GeoPoint) {
        let rationals = |dms: crate::geo::Dms| {
            Value::Rational(
                dms.to_rationals()
                    .iter()
                    .map(|&(num, denom)| Rational { num, denom })
                    .collect(),
            )
        };

        self.set(Tag::GPSVersionID, Value::Byte(vec![2, 2, 0, 0]));
        self.set_ascii(Tag::GPSLatitudeRef, point.latitude_ref());
        self.set(Tag::GPSLatitude, rationals(point.latitude_dms()));
        self.set_ascii(Tag::GPSLongitudeRef, point.longitude_ref());
        self.set(Tag::GPSLongitude, rationals(point.longitude_dms()));
    }

    /// Serialize as a big-endian TIFF stream (APP1 payload without `Exif\0\0`)
    pub fn encode(&self) -> ProcessResult<Vec<u8>> {
        let mut writer = Writer::new();
        for field in &self.fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false)?;
        Ok(buf.into_inner())
    }
}

/// First ASCII component of a field value
pub fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|part| String::from_utf8_lossy(part).into_owned()),
        _ => None,
    }
}

/// Rational components of a field value as `(num, denom)` pairs
pub fn rational_values(value: &Value) -> Option<Vec<(u32, u32)>> {
    match value {
        Value::Rational(parts) => Some(parts.iter().map(|r| (r.num, r.denom)).collect()),
        _ => None,
    }
}
