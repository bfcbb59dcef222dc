//! WebP RIFF layout.
//!
//! A simple WebP (a lone `VP8 ` or `VP8L` chunk) cannot carry metadata:
//! readers only look for `EXIF` when a `VP8X` header announces it. After an
//! `EXIF` chunk is written the file is normalized to the extended layout
//! `VP8X, ICCP?, ANIM?, <image chunks>, EXIF, XMP ?` with the flags matching
//! the chunks actually present.

use crate::error::{ProcessError, ProcessResult};

const RIFF: &[u8; 4] = b"RIFF";
const WEBP: &[u8; 4] = b"WEBP";

const VP8X: [u8; 4] = *b"VP8X";
const VP8: [u8; 4] = *b"VP8 ";
const VP8L: [u8; 4] = *b"VP8L";
const ALPH: [u8; 4] = *b"ALPH";
const ANIM: [u8; 4] = *b"ANIM";
const ICCP: [u8; 4] = *b"ICCP";
const EXIF: [u8; 4] = *b"EXIF";
const XMP: [u8; 4] = *b"XMP ";

const FLAG_ANIMATION: u8 = 0x02;
const FLAG_XMP: u8 = 0x04;
const FLAG_EXIF: u8 = 0x08;
const FLAG_ALPHA: u8 = 0x10;
const FLAG_ICC: u8 = 0x20;

const VP8L_SIGNATURE: u8 = 0x2f;
const VP8_START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];

#[derive(Debug, Clone, PartialEq)]
struct Chunk {
    id: [u8; 4],
    data: Vec<u8>,
}

impl Chunk {
    fn is(&self, id: [u8; 4]) -> bool {
        self.id == id
    }
}

/// Rewrite `bytes` so that its `EXIF` chunk is announced by a `VP8X` header
pub fn ensure_extended(bytes: &[u8]) -> ProcessResult<Vec<u8>> {
    let chunks = parse_chunks(bytes)?;
    let has = |id| chunks.iter().any(|c: &Chunk| c.is(id));

    if !has(EXIF) && !has(VP8X) {
        return Ok(bytes.to_vec());
    }

    let (width, height, lossless_alpha) = match chunks.iter().find(|c| c.is(VP8X)) {
        Some(vp8x) => canvas_from_vp8x(&vp8x.data)?,
        None => canvas_from_bitstream(&chunks)?,
    };

    let mut flags = 0;
    if has(ICCP) {
        flags |= FLAG_ICC;
    }
    if has(ALPH) || lossless_alpha {
        flags |= FLAG_ALPHA;
    }
    if has(EXIF) {
        flags |= FLAG_EXIF;
    }
    if has(XMP) {
        flags |= FLAG_XMP;
    }
    if has(ANIM) {
        flags |= FLAG_ANIMATION;
    }

    let mut header = vec![flags, 0, 0, 0];
    header.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    header.extend_from_slice(&(height - 1).to_le_bytes()[..3]);

    let mut ordered = vec![Chunk { id: VP8X, data: header }];
    ordered.extend(chunks.iter().filter(|c| c.is(ICCP)).cloned());
    ordered.extend(chunks.iter().filter(|c| c.is(ANIM)).cloned());
    ordered.extend(
        chunks
            .iter()
            .filter(|c| ![VP8X, ICCP, ANIM, EXIF, XMP].contains(&c.id))
            .cloned(),
    );
    ordered.extend(chunks.iter().filter(|c| c.is(EXIF)).cloned());
    ordered.extend(chunks.iter().filter(|c| c.is(XMP)).cloned());

    Ok(encode_chunks(&ordered))
}

fn parse_chunks(bytes: &[u8]) -> ProcessResult<Vec<Chunk>> {
    if bytes.len() < 12 || &bytes[0..4] != RIFF || &bytes[8..12] != WEBP {
        return Err(ProcessError::MetadataWrite("not a RIFF/WEBP file".to_string()));
    }

    let mut chunks = Vec::new();
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = [bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let start = offset + 8;
        let end = start
            .checked_add(size)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                ProcessError::MetadataWrite(format!(
                    "WebP chunk {} overruns the file",
                    String::from_utf8_lossy(&id)
                ))
            })?;

        chunks.push(Chunk { id, data: bytes[start..end].to_vec() });
        offset = end + (size & 1);
    }

    Ok(chunks)
}

fn encode_chunks(chunks: &[Chunk]) -> Vec<u8> {
    let mut body = Vec::new();
    for chunk in chunks {
        body.extend_from_slice(&chunk.id);
        body.extend_from_slice(&(chunk.data.len() as u32).to_le_bytes());
        body.extend_from_slice(&chunk.data);
        if chunk.data.len() % 2 == 1 {
            body.push(0);
        }
    }

    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(RIFF);
    out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(WEBP);
    out.extend_from_slice(&body);
    out
}

fn canvas_from_vp8x(data: &[u8]) -> ProcessResult<(u32, u32, bool)> {
    if data.len() < 10 {
        return Err(ProcessError::MetadataWrite("truncated VP8X chunk".to_string()));
    }
    let width = u32::from_le_bytes([data[4], data[5], data[6], 0]) + 1;
    let height = u32::from_le_bytes([data[7], data[8], data[9], 0]) + 1;
    Ok((width, height, data[0] & FLAG_ALPHA != 0))
}

/// Canvas size from the first `VP8L` or `VP8 ` bitstream header
fn canvas_from_bitstream(chunks: &[Chunk]) -> ProcessResult<(u32, u32, bool)> {
    for chunk in chunks {
        let data = &chunk.data;
        if chunk.is(VP8L) && data.len() >= 5 && data[0] == VP8L_SIGNATURE {
            let bits = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            let alpha = (bits >> 28) & 1 == 1;
            return Ok((width, height, alpha));
        }
        if chunk.is(VP8) && data.len() >= 10 && data[3..6] == VP8_START_CODE {
            let width = u32::from(u16::from_le_bytes([data[6], data[7]]) & 0x3FFF);
            let height = u32::from(u16::from_le_bytes([data[8], data[9]]) & 0x3FFF);
            return Ok((width, height, false));
        }
    }

    Err(ProcessError::MetadataWrite("WebP without a VP8/VP8L bitstream".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn simple_webp(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
            .write_to(&mut out, ImageFormat::WebP)
            .unwrap();
        out.into_inner()
    }

    fn with_chunk(bytes: &[u8], chunk: Chunk) -> Vec<u8> {
        let mut chunks = parse_chunks(bytes).unwrap();
        chunks.push(chunk);
        encode_chunks(&chunks)
    }

    #[test]
    fn test_simple_file_without_exif_is_untouched() {
        let bytes = simple_webp(8, 6);
        assert_eq!(ensure_extended(&bytes).unwrap(), bytes);
    }

    #[test]
    fn test_exif_chunk_gets_vp8x_header() {
        let bytes = with_chunk(&simple_webp(300, 7), Chunk { id: EXIF, data: b"MM\0*abc".to_vec() });

        let extended = ensure_extended(&bytes).unwrap();
        let chunks = parse_chunks(&extended).unwrap();

        assert_eq!(chunks[0].id, VP8X);
        assert_eq!(chunks.last().unwrap().id, EXIF);
        let (width, height, _) = canvas_from_vp8x(&chunks[0].data).unwrap();
        assert_eq!((width, height), (300, 7));
        assert_eq!(chunks[0].data[0] & FLAG_EXIF, FLAG_EXIF);
        // Odd-sized payload keeps its padding and the RIFF size stays consistent
        assert_eq!(chunks.last().unwrap().data, b"MM\0*abc");
        let riff_size = u32::from_le_bytes([extended[4], extended[5], extended[6], extended[7]]);
        assert_eq!(riff_size as usize, extended.len() - 8);

        // Idempotent
        assert_eq!(ensure_extended(&extended).unwrap(), extended);
        assert!(image::load_from_memory(&extended).is_ok());
    }

    #[test]
    fn test_rejects_non_riff() {
        assert!(ensure_extended(b"\xff\xd8\xff\xe0 jpeg").is_err());
    }
}
