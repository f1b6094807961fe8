//! IPTC-IIM writer and reader for JPEG files.
//!
//! IPTC travels inside the JPEG APP13 segment: a `Photoshop 3.0\0` header
//! followed by 8BIM image resource blocks. Resource `0x0404` holds the raw
//! IIM datasets, each laid out as:
//!
//! ```text
//! 0x1C  record  dataset  len(u16 BE)  value[len]
//! ```
//!
//! Written datasets, in order:
//!
//! | Dataset | Field | Byte limit |
//! |---|---|---|
//! | 1:90 | Coded character set (`ESC % G` = UTF-8) | |
//! | 2:00 | Record version (4) | |
//! | 2:05 | Object name | 64 |
//! | 2:15 | Category | 3 |
//! | 2:20 | Supplemental category (repeatable) | 32 |
//! | 2:25 | Keywords (repeatable, max 15 entries) | 64 |
//! | 2:40 | Special instructions | 256 |
//! | 2:105 | Headline | 256 |
//! | 2:110 | Credit | 32 |
//! | 2:115 | Source | 32 |
//! | 2:116 | Copyright notice | 128 |
//! | 2:120 | Caption / abstract | 2000 |
//!
//! Values over their limit are cut at a UTF-8 character boundary. Other 8BIM
//! resources already present in the segment are carried over untouched.

use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use img_parts::Bytes;
use thiserror::Error;

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;
const TAG_MARKER: u8 = 0x1C;
const UTF8_CHARSET: &[u8] = b"\x1b%G";
const RECORD_VERSION: u16 = 4;

/// Keyword entries beyond this are dropped.
pub const MAX_KEYWORDS: usize = 15;

const DS_CHARSET: (u8, u8) = (1, 90);
const DS_RECORD_VERSION: (u8, u8) = (2, 0);
const DS_OBJECT_NAME: (u8, u8) = (2, 5);
const DS_CATEGORY: (u8, u8) = (2, 15);
const DS_SUPPLEMENTAL: (u8, u8) = (2, 20);
const DS_KEYWORDS: (u8, u8) = (2, 25);
const DS_SPECIAL_INSTRUCTIONS: (u8, u8) = (2, 40);
const DS_HEADLINE: (u8, u8) = (2, 105);
const DS_CREDIT: (u8, u8) = (2, 110);
const DS_SOURCE: (u8, u8) = (2, 115);
const DS_COPYRIGHT: (u8, u8) = (2, 116);
const DS_CAPTION: (u8, u8) = (2, 120);

#[derive(Error, Debug)]
pub enum IptcError {
    #[error("not a readable JPEG: {0}")]
    Jpeg(#[from] img_parts::Error),
    #[error("failed to write JPEG: {0}")]
    Io(#[from] std::io::Error),
}

/// Editorial fields carried in IPTC record 2.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcRecord {
    pub object_name: String,
    pub headline: String,
    pub caption: String,
    pub category: String,
    pub supplemental_categories: Vec<String>,
    pub keywords: Vec<String>,
    pub special_instructions: String,
    pub credit: String,
    pub source: String,
    pub copyright: String,
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Longest prefix of `text` that fits in `limit` bytes without splitting a character.
fn clip(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn push_dataset(out: &mut Vec<u8>, (record, dataset): (u8, u8), value: &[u8]) {
    out.push(TAG_MARKER);
    out.push(record);
    out.push(dataset);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
}

fn push_text(out: &mut Vec<u8>, ds: (u8, u8), text: &str, limit: usize) {
    let text = clip(text.trim(), limit);
    if !text.is_empty() {
        push_dataset(out, ds, text.as_bytes());
    }
}

/// Encode a record as raw IIM datasets.
pub fn build_iim(record: &IptcRecord) -> Vec<u8> {
    let mut out = Vec::new();
    push_dataset(&mut out, DS_CHARSET, UTF8_CHARSET);
    push_dataset(&mut out, DS_RECORD_VERSION, &RECORD_VERSION.to_be_bytes());
    push_text(&mut out, DS_OBJECT_NAME, &record.object_name, 64);
    push_text(&mut out, DS_CATEGORY, &record.category, 3);
    for supplemental in &record.supplemental_categories {
        push_text(&mut out, DS_SUPPLEMENTAL, supplemental, 32);
    }
    for keyword in record.keywords.iter().take(MAX_KEYWORDS) {
        push_text(&mut out, DS_KEYWORDS, keyword, 64);
    }
    push_text(&mut out, DS_SPECIAL_INSTRUCTIONS, &record.special_instructions, 256);
    push_text(&mut out, DS_HEADLINE, &record.headline, 256);
    push_text(&mut out, DS_CREDIT, &record.credit, 32);
    push_text(&mut out, DS_SOURCE, &record.source, 32);
    push_text(&mut out, DS_COPYRIGHT, &record.copyright, 128);
    push_text(&mut out, DS_CAPTION, &record.caption, 2000);
    out
}

/// Wrap IIM bytes in an 8BIM `0x0404` resource block.
fn iptc_resource(iim: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(12 + iim.len() + 1);
    block.extend_from_slice(BIM_MARKER);
    block.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
    // Empty Pascal-string name, padded to even length
    block.extend_from_slice(&[0, 0]);
    block.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    block.extend_from_slice(iim);
    if iim.len() % 2 == 1 {
        block.push(0);
    }
    block
}

/// Build APP13 contents, keeping every non-IPTC resource from `existing`.
fn build_app13(existing: Option<&[u8]>, iim: &[u8]) -> Vec<u8> {
    let mut out = PHOTOSHOP_HEADER.to_vec();
    if let Some(body) = existing.and_then(|c| c.strip_prefix(PHOTOSHOP_HEADER)) {
        for block in resource_blocks(body) {
            if block.id != IPTC_RESOURCE_ID {
                out.extend_from_slice(block.raw);
            }
        }
    }
    out.extend_from_slice(&iptc_resource(iim));
    out
}

/// Return a copy of `jpeg` with its IPTC resource replaced by `record`.
///
/// A new APP13 segment goes right after the leading APPn run (JFIF / EXIF).
pub fn embed_iptc_in_jpeg(jpeg: &[u8], record: &IptcRecord) -> Result<Vec<u8>, IptcError> {
    let mut parsed = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg))?;
    let iim = build_iim(record);
    let segments = parsed.segments_mut();

    match segments.iter().position(is_photoshop_segment) {
        Some(i) => {
            let contents = build_app13(Some(segments[i].contents()), &iim);
            segments[i] = JpegSegment::new_with_contents(markers::APP13, contents.into());
        }
        None => {
            let insert_at = segments
                .iter()
                .position(|s| !(markers::APP0..=markers::APP15).contains(&s.marker()))
                .unwrap_or(segments.len());
            let contents = build_app13(None, &iim);
            segments.insert(
                insert_at,
                JpegSegment::new_with_contents(markers::APP13, contents.into()),
            );
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + iim.len() + 64);
    parsed.encoder().write_to(&mut out)?;
    Ok(out)
}

fn is_photoshop_segment(segment: &JpegSegment) -> bool {
    segment.marker() == markers::APP13 && segment.contents().starts_with(PHOTOSHOP_HEADER)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

struct ResourceBlock<'a> {
    id: u16,
    data: &'a [u8],
    /// Whole block including header and padding.
    raw: &'a [u8],
}

/// Iterate 8BIM resource blocks, stopping at the first malformed one.
fn resource_blocks(mut body: &[u8]) -> Vec<ResourceBlock<'_>> {
    let mut blocks = Vec::new();
    while body.len() >= 12 && body.starts_with(BIM_MARKER) {
        let id = u16::from_be_bytes([body[4], body[5]]);
        // Pascal string: length byte + chars, padded to even total
        let name_len = body[6] as usize;
        let name_total = (1 + name_len + 1) & !1;
        let size_at = 6 + name_total;
        let Some(size_bytes) = body.get(size_at..size_at + 4) else {
            break;
        };
        let size = u32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
            as usize;
        let data_at = size_at + 4;
        let Some(data) = body.get(data_at..data_at + size) else {
            break;
        };
        let end = (data_at + size + (size & 1)).min(body.len());
        blocks.push(ResourceBlock {
            id,
            data,
            raw: &body[..end],
        });
        body = &body[end..];
    }
    blocks
}

/// Parse raw IIM datasets. Unknown datasets are skipped.
pub fn parse_iim(data: &[u8]) -> IptcRecord {
    let mut record = IptcRecord::default();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != TAG_MARKER {
            pos += 1;
            continue;
        }
        let ds = (data[pos + 1], data[pos + 2]);
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;
        if pos + length > data.len() {
            break;
        }
        let value = String::from_utf8_lossy(&data[pos..pos + length])
            .trim()
            .to_string();
        pos += length;

        match ds {
            DS_OBJECT_NAME => record.object_name = value,
            DS_CATEGORY => record.category = value,
            DS_SUPPLEMENTAL => record.supplemental_categories.push(value),
            DS_KEYWORDS => record.keywords.push(value),
            DS_SPECIAL_INSTRUCTIONS => record.special_instructions = value,
            DS_HEADLINE => record.headline = value,
            DS_CREDIT => record.credit = value,
            DS_SOURCE => record.source = value,
            DS_COPYRIGHT => record.copyright = value,
            DS_CAPTION => record.caption = value,
            _ => {}
        }
    }
    record
}

/// Read the IPTC record from JPEG bytes, `Ok(None)` when the file carries none.
pub fn read_iptc_from_jpeg(jpeg: &[u8]) -> Result<Option<IptcRecord>, IptcError> {
    let parsed = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg))?;
    let record = parsed
        .segments()
        .iter()
        .filter(|s| is_photoshop_segment(s))
        .find_map(|s| {
            let body = &s.contents()[PHOTOSHOP_HEADER.len()..];
            resource_blocks(body)
                .into_iter()
                .find(|b| b.id == IPTC_RESOURCE_ID)
                .map(|b| parse_iim(b.data))
        });
    Ok(record)
}
