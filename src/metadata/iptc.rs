//! IPTC-IIM datasets stored in the JPEG APP13 Photoshop resource block.
//!
//! APP13 layout: `"Photoshop 3.0\0"` followed by `8BIM` resource blocks; the
//! block with id `0x0404` holds the IIM datasets (`0x1C`, record, dataset,
//! big-endian length, data). Other resource blocks are preserved verbatim.

use crate::error::{ProcessError, ProcessResult};

pub const PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;
const TAG_MARKER: u8 = 0x1C;

/// Record 1 dataset 90, value `ESC % G` declares UTF-8 text
pub const CODED_CHARACTER_SET: (u8, u8) = (1, 90);
pub const RECORD_VERSION: (u8, u8) = (2, 0);
pub const ORIGINATING_PROGRAM: (u8, u8) = (2, 65);
pub const SOURCE: (u8, u8) = (2, 115);
pub const CAPTION_ABSTRACT: (u8, u8) = (2, 120);

const UTF8_ESCAPE: &[u8] = &[0x1B, 0x25, 0x47];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dataset {
    record: u8,
    number: u8,
    data: Vec<u8>,
}

/// Ordered list of IIM datasets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcRecord {
    datasets: Vec<Dataset>,
}

impl IptcRecord {
    pub fn parse(mut input: &[u8]) -> ProcessResult<Self> {
        let mut datasets = Vec::new();

        while !input.is_empty() {
            // Trailing padding after the last dataset
            if input[0] != TAG_MARKER {
                break;
            }
            if input.len() < 5 {
                return Err(ProcessError::MetadataWrite("truncated IPTC dataset header".to_string()));
            }
            let record = input[1];
            let number = input[2];
            let raw_len = u16::from_be_bytes([input[3], input[4]]) as usize;
            input = &input[5..];

            let len = if raw_len & 0x8000 != 0 {
                let octets = raw_len & 0x7FFF;
                if octets == 0 || octets > 8 || input.len() < octets {
                    return Err(ProcessError::MetadataWrite("invalid IPTC extended length".to_string()));
                }
                let len = input[..octets].iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
                input = &input[octets..];
                len
            } else {
                raw_len
            };

            if input.len() < len {
                return Err(ProcessError::MetadataWrite("truncated IPTC dataset".to_string()));
            }
            datasets.push(Dataset { record, number, data: input[..len].to_vec() });
            input = &input[len..];
        }

        Ok(Self { datasets })
    }

    pub fn get(&self, tag: (u8, u8)) -> Option<&[u8]> {
        self.datasets
            .iter()
            .find(|d| (d.record, d.number) == tag)
            .map(|d| d.data.as_slice())
    }

    pub fn get_text(&self, tag: (u8, u8)) -> Option<String> {
        self.get(tag).map(|data| String::from_utf8_lossy(data).into_owned())
    }

    /// Replace every occurrence of `tag` with a single dataset
    pub fn set(&mut self, tag: (u8, u8), data: Vec<u8>) {
        self.datasets.retain(|d| (d.record, d.number) != tag);
        self.datasets.push(Dataset { record: tag.0, number: tag.1, data });
    }

    /// Set a text dataset, truncated to `max_len` bytes on a char boundary
    pub fn set_text(&mut self, tag: (u8, u8), text: &str, max_len: usize) {
        let mut end = text.len().min(max_len);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.set(tag, text.as_bytes()[..end].to_vec());
    }

    /// Mark the text datasets as UTF-8
    pub fn declare_utf8(&mut self) {
        self.set(CODED_CHARACTER_SET, UTF8_ESCAPE.to_vec());
        if self.get(RECORD_VERSION).is_none() {
            self.set(RECORD_VERSION, vec![0x00, 0x04]);
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut datasets: Vec<&Dataset> = self.datasets.iter().collect();
        datasets.sort_by_key(|d| (d.record, d.number));

        let mut out = Vec::new();
        for dataset in datasets {
            out.push(TAG_MARKER);
            out.push(dataset.record);
            out.push(dataset.number);
            if dataset.data.len() < 0x8000 {
                out.extend_from_slice(&(dataset.data.len() as u16).to_be_bytes());
            } else {
                out.extend_from_slice(&0x8004u16.to_be_bytes());
                out.extend_from_slice(&(dataset.data.len() as u32).to_be_bytes());
            }
            out.extend_from_slice(&dataset.data);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceBlock {
    id: u16,
    /// Pascal string including its length byte and padding
    name: Vec<u8>,
    data: Vec<u8>,
}

/// Contents of a Photoshop APP13 segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoshopResources {
    blocks: Vec<ResourceBlock>,
}

impl PhotoshopResources {
    /// Parse APP13 contents (including the `Photoshop 3.0` signature)
    pub fn parse(contents: &[u8]) -> ProcessResult<Self> {
        let mut input = contents
            .strip_prefix(PHOTOSHOP_SIGNATURE)
            .ok_or_else(|| ProcessError::MetadataWrite("APP13 is not a Photoshop segment".to_string()))?;
        let mut blocks = Vec::new();

        while input.len() >= 4 && input.starts_with(RESOURCE_SIGNATURE) {
            let malformed = || ProcessError::MetadataWrite("truncated Photoshop resource block".to_string());
            input = &input[4..];
            if input.len() < 3 {
                return Err(malformed());
            }
            let id = u16::from_be_bytes([input[0], input[1]]);
            input = &input[2..];

            let mut name_len = 1 + input[0] as usize;
            name_len += name_len % 2;
            if input.len() < name_len + 4 {
                return Err(malformed());
            }
            let name = input[..name_len].to_vec();
            input = &input[name_len..];

            let size = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
            input = &input[4..];
            if input.len() < size {
                return Err(malformed());
            }
            let data = input[..size].to_vec();
            input = &input[size..];
            if size % 2 == 1 && !input.is_empty() {
                input = &input[1..];
            }

            blocks.push(ResourceBlock { id, name, data });
        }

        Ok(Self { blocks })
    }

    /// IIM datasets of the `0x0404` block, empty if the block is absent
    pub fn iptc(&self) -> ProcessResult<IptcRecord> {
        match self.blocks.iter().find(|b| b.id == IPTC_RESOURCE_ID) {
            Some(block) => IptcRecord::parse(&block.data),
            None => Ok(IptcRecord::default()),
        }
    }

    pub fn set_iptc(&mut self, record: &IptcRecord) {
        let data = record.encode();
        match self.blocks.iter_mut().find(|b| b.id == IPTC_RESOURCE_ID) {
            Some(block) => block.data = data,
            None => self.blocks.push(ResourceBlock {
                id: IPTC_RESOURCE_ID,
                name: vec![0, 0],
                data,
            }),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = PHOTOSHOP_SIGNATURE.to_vec();
        for block in &self.blocks {
            out.extend_from_slice(RESOURCE_SIGNATURE);
            out.extend_from_slice(&block.id.to_be_bytes());
            out.extend_from_slice(&block.name);
            out.extend_from_slice(&(block.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&block.data);
            if block.data.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }
}
