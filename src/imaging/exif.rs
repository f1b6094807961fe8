//! Minimal EXIF block writer and reader.
//!
//! An EXIF block is a little TIFF file: an 8-byte header followed by image
//! file directories (IFDs). Each IFD is a count, a run of 12-byte entries
//! (`tag, type, count, value-or-offset`) and the offset of the next IFD.
//! Values of four bytes or less live inline; longer values go to a data
//! area right after the directory.
//!
//! The writer only emits the descriptive fields this crate cares about:
//!
//! | Tag | Name | IFD | Type |
//! |---|---|---|---|
//! | `0x010E` | ImageDescription | 0 | ASCII |
//! | `0x0131` | Software | 0 | ASCII |
//! | `0x013B` | Artist | 0 | ASCII |
//! | `0x8298` | Copyright | 0 | ASCII |
//! | `0x8769` | Exif IFD pointer | 0 | LONG |
//! | `0x9C9B` | XPTitle | 0 | BYTE (UTF-16LE) |
//! | `0x9C9C` | XPComment | 0 | BYTE (UTF-16LE) |
//! | `0x9C9E` | XPKeywords | 0 | BYTE (UTF-16LE) |
//! | `0x9C9F` | XPSubject | 0 | BYTE (UTF-16LE) |
//! | `0x9286` | UserComment | Exif | UNDEFINED (charset-prefixed) |
//!
//! ASCII fields carry UTF-8 bytes with a trailing NUL, which is what most
//! readers accept in practice. The output has no `Exif\0\0` prefix; the
//! container layer adds it.

use thiserror::Error;

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_XP_TITLE: u16 = 0x9C9B;
const TAG_XP_COMMENT: u16 = 0x9C9C;
const TAG_XP_KEYWORDS: u16 = 0x9C9E;
const TAG_XP_SUBJECT: u16 = 0x9C9F;
const TAG_USER_COMMENT: u16 = 0x9286;

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_UNDEFINED: u16 = 7;

const CHARSET_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const CHARSET_UNICODE: &[u8; 8] = b"UNICODE\0";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExifError {
    #[error("EXIF block is truncated")]
    Truncated,
    #[error("EXIF block has no TIFF header")]
    BadHeader,
}

/// Descriptive EXIF fields. Empty strings are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifFields {
    pub description: String,
    pub artist: String,
    pub software: String,
    pub copyright: String,
    pub xp_title: String,
    pub xp_comment: String,
    pub xp_keywords: String,
    pub xp_subject: String,
    pub user_comment: String,
}

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Self {
            tag,
            kind: TYPE_ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn utf16(tag: u16, text: &str) -> Self {
        let mut data: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        data.extend_from_slice(&[0, 0]);
        Self {
            tag,
            kind: TYPE_BYTE,
            count: data.len() as u32,
            data,
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            kind: TYPE_LONG,
            count: 1,
            data: value.to_le_bytes().to_vec(),
        }
    }

    fn user_comment(text: &str) -> Self {
        let mut data = Vec::with_capacity(8 + text.len() * 2);
        if text.is_ascii() {
            data.extend_from_slice(CHARSET_ASCII);
            data.extend_from_slice(text.as_bytes());
        } else {
            data.extend_from_slice(CHARSET_UNICODE);
            data.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        }
        Self {
            tag: TAG_USER_COMMENT,
            kind: TYPE_UNDEFINED,
            count: data.len() as u32,
            data,
        }
    }

    /// Bytes this entry occupies in the data area (zero when inline).
    fn spill(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

fn ifd_len(entries: &[Entry]) -> usize {
    2 + entries.len() * 12 + 4 + entries.iter().map(Entry::spill).sum::<usize>()
}

/// Append one IFD (directory then data area) at `out.len()`.
fn write_ifd(out: &mut Vec<u8>, entries: &[Entry]) {
    let start = out.len();
    let mut data_offset = start + 2 + entries.len() * 12 + 4;
    let mut data_area = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.kind.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(data_offset as u32).to_le_bytes());
            data_area.extend_from_slice(&entry.data);
            if entry.data.len() % 2 == 1 {
                data_area.push(0);
            }
            data_offset += entry.spill();
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data_area);
}

/// Serialize fields into a little-endian TIFF structure.
pub fn build_exif(fields: &ExifFields) -> Vec<u8> {
    let mut exif_ifd = Vec::new();
    if !fields.user_comment.is_empty() {
        exif_ifd.push(Entry::user_comment(&fields.user_comment));
    }

    let mut ifd0 = Vec::new();
    for (tag, text) in [
        (TAG_IMAGE_DESCRIPTION, &fields.description),
        (TAG_SOFTWARE, &fields.software),
        (TAG_ARTIST, &fields.artist),
        (TAG_COPYRIGHT, &fields.copyright),
    ] {
        if !text.is_empty() {
            ifd0.push(Entry::ascii(tag, text));
        }
    }
    // Placeholder; patched once the IFD0 size is known.
    let pointer_index = (!exif_ifd.is_empty()).then(|| {
        ifd0.push(Entry::long(TAG_EXIF_IFD, 0));
        ifd0.len() - 1
    });
    for (tag, text) in [
        (TAG_XP_TITLE, &fields.xp_title),
        (TAG_XP_COMMENT, &fields.xp_comment),
        (TAG_XP_KEYWORDS, &fields.xp_keywords),
        (TAG_XP_SUBJECT, &fields.xp_subject),
    ] {
        if !text.is_empty() {
            ifd0.push(Entry::utf16(tag, text));
        }
    }

    let exif_offset = 8 + ifd_len(&ifd0);
    if let Some(i) = pointer_index {
        ifd0[i] = Entry::long(TAG_EXIF_IFD, exif_offset as u32);
    }

    let mut out = Vec::with_capacity(exif_offset + ifd_len(&exif_ifd));
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    write_ifd(&mut out, &ifd0);
    if !exif_ifd.is_empty() {
        write_ifd(&mut out, &exif_ifd);
    }
    out
}

// ============================================================================
// Reader
// ============================================================================

struct Tiff<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Result<Self, ExifError> {
        let little_endian = match data.get(0..2) {
            Some(b"II") => true,
            Some(b"MM") => false,
            Some(_) => return Err(ExifError::BadHeader),
            None => return Err(ExifError::Truncated),
        };
        let tiff = Self {
            data,
            little_endian,
        };
        if tiff.u16_at(2)? != 42 {
            return Err(ExifError::BadHeader);
        }
        Ok(tiff)
    }

    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ExifError> {
        self.data
            .get(offset..offset.checked_add(len).ok_or(ExifError::Truncated)?)
            .ok_or(ExifError::Truncated)
    }

    fn u16_at(&self, offset: usize) -> Result<u16, ExifError> {
        let b: [u8; 2] = self.bytes(offset, 2)?.try_into().map_err(|_| ExifError::Truncated)?;
        Ok(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, ExifError> {
        let b: [u8; 4] = self.bytes(offset, 4)?.try_into().map_err(|_| ExifError::Truncated)?;
        Ok(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    /// `(tag, raw value bytes)` for every entry of the IFD at `offset`.
    fn entries(&self, offset: usize) -> Result<Vec<(u16, &'a [u8])>, ExifError> {
        let count = self.u16_at(offset)? as usize;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let at = offset + 2 + i * 12;
            let tag = self.u16_at(at)?;
            let kind = self.u16_at(at + 2)?;
            let n = self.u32_at(at + 4)? as usize;
            let unit = match kind {
                TYPE_SHORT => 2,
                TYPE_LONG => 4,
                TYPE_RATIONAL => 8,
                _ => 1,
            };
            let len = n.saturating_mul(unit);
            let value = if len <= 4 {
                self.bytes(at + 8, len)?
            } else {
                self.bytes(self.u32_at(at + 8)? as usize, len)?
            };
            out.push((tag, value));
        }
        Ok(out)
    }
}

fn ascii_value(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn utf16_value(raw: &[u8], little_endian: bool) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| {
            if little_endian {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        })
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

fn user_comment_value(raw: &[u8], little_endian: bool) -> String {
    if raw.len() < 8 {
        return String::new();
    }
    let (charset, body) = raw.split_at(8);
    if charset == CHARSET_UNICODE {
        utf16_value(body, little_endian)
    } else {
        ascii_value(body)
    }
}

/// Parse the fields written by [`build_exif`] out of a TIFF structure.
///
/// Unknown tags are ignored; missing tags come back as empty strings.
pub fn parse_exif(tiff: &[u8]) -> Result<ExifFields, ExifError> {
    let tiff = Tiff::new(tiff)?;
    let le = tiff.little_endian;
    let ifd0 = tiff.u32_at(4)? as usize;

    let mut fields = ExifFields::default();
    let mut exif_ifd = None;
    for (tag, raw) in tiff.entries(ifd0)? {
        match tag {
            TAG_IMAGE_DESCRIPTION => fields.description = ascii_value(raw),
            TAG_SOFTWARE => fields.software = ascii_value(raw),
            TAG_ARTIST => fields.artist = ascii_value(raw),
            TAG_COPYRIGHT => fields.copyright = ascii_value(raw),
            TAG_XP_TITLE => fields.xp_title = utf16_value(raw, true),
            TAG_XP_COMMENT => fields.xp_comment = utf16_value(raw, true),
            TAG_XP_KEYWORDS => fields.xp_keywords = utf16_value(raw, true),
            TAG_XP_SUBJECT => fields.xp_subject = utf16_value(raw, true),
            TAG_EXIF_IFD if raw.len() == 4 => {
                let b = [raw[0], raw[1], raw[2], raw[3]];
                exif_ifd = Some(if le {
                    u32::from_le_bytes(b)
                } else {
                    u32::from_be_bytes(b)
                } as usize);
            }
            _ => {}
        }
    }

    if let Some(offset) = exif_ifd {
        for (tag, raw) in tiff.entries(offset)? {
            if tag == TAG_USER_COMMENT {
                fields.user_comment = user_comment_value(raw, le);
            }
        }
    }
    Ok(fields)
}
