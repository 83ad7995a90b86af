// Text encodings used inside ID3v2 frames

use encoding_rs::{mem, UTF_8};
use tracing::warn;

/// Text encoding byte at the start of ID3v2 text payloads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TextEncoding::Latin1),
            1 => Some(TextEncoding::Utf16),
            2 => Some(TextEncoding::Utf16BE),
            3 => Some(TextEncoding::Utf8),
            _ => None,
        }
    }
}

const BOM: u16 = 0xFEFF;
const SWAPPED_BOM: u16 = 0xFFFE;

/// Read a null-terminated string starting at `offset`.
///
/// Returns the string and the offset just past its terminator (or the end
/// of `buf` when there is none).
pub fn read_encoded_string(encoding: u8, buf: &[u8], offset: usize) -> (String, usize) {
    if offset >= buf.len() {
        return (String::new(), buf.len());
    }

    match TextEncoding::from_byte(encoding) {
        Some(TextEncoding::Latin1) => {
            let (end, next) = single_byte_terminator(buf, offset);
            (mem::decode_latin1(&buf[offset..end]).into_owned(), next)
        }
        Some(TextEncoding::Utf8) => {
            let (end, next) = single_byte_terminator(buf, offset);
            let text = UTF_8.decode_without_bom_handling(&buf[offset..end]).0;
            (text.into_owned(), next)
        }
        Some(TextEncoding::Utf16) | Some(TextEncoding::Utf16BE) => read_utf16(buf, offset),
        None => {
            warn!(encoding, offset, "unknown ID3v2 text encoding, skipping string");
            (String::new(), offset)
        }
    }
}

fn single_byte_terminator(buf: &[u8], offset: usize) -> (usize, usize) {
    match buf[offset..].iter().position(|&b| b == 0) {
        Some(idx) => (offset + idx, offset + idx + 1),
        None => (buf.len(), buf.len()),
    }
}

/// UTF-16 without a BOM is big-endian; a swapped BOM anywhere flips the
/// byte order for the rest of the string.
fn read_utf16(buf: &[u8], mut offset: usize) -> (String, usize) {
    let mut units = Vec::new();
    let mut little_endian = false;

    while offset + 1 < buf.len() {
        let pair = [buf[offset], buf[offset + 1]];
        offset += 2;
        let unit = if little_endian {
            u16::from_le_bytes(pair)
        } else {
            u16::from_be_bytes(pair)
        };
        match unit {
            0 => return (String::from_utf16_lossy(&units), offset),
            BOM => {}
            SWAPPED_BOM => little_endian = !little_endian,
            other => units.push(other),
        }
    }

    (String::from_utf16_lossy(&units), buf.len())
}

/// Encode `text` as Latin-1; characters outside it become `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    if mem::is_str_latin1(text) {
        return mem::encode_latin1_lossy(text).into_owned();
    }
    text.chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .collect()
}
