// ID3v2 tag and frame headers

use std::io::Read;

use tracing::{debug, warn};

use crate::error::{Result, SplitError};
use crate::id3::frames::{read_frame, Frame};
use crate::utils::ByteSource;

pub const HEADER_SIZE: usize = 10;
pub const FRAME_HEADER_SIZE: usize = 10;
const ID: [u8; 3] = [b'I', b'D', b'3'];
const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

/// Decode a 28-bit synchsafe integer; `None` if any byte has its high bit set.
pub fn decode_synchsafe(bytes: &[u8; 4]) -> Option<u32> {
    if bytes.iter().any(|&b| b & 0x80 != 0) {
        return None;
    }
    Some(
        ((bytes[0] as u32) << 21)
            | ((bytes[1] as u32) << 14)
            | ((bytes[2] as u32) << 7)
            | (bytes[3] as u32),
    )
}

/// Encode the low 28 bits of `value` as a synchsafe integer.
pub fn encode_synchsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// Tag-level flags from the sixth header byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagFlags {
    pub unsynchronisation: bool,
    pub extended_header: bool,
    pub experimental: bool,
    pub footer: bool,
}

impl TagFlags {
    fn from_byte(byte: u8) -> Self {
        TagFlags {
            unsynchronisation: byte & 0x80 != 0,
            extended_header: byte & 0x40 != 0,
            experimental: byte & 0x20 != 0,
            footer: byte & 0x10 != 0,
        }
    }
}

/// ID3v2 header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub version: (u8, u8),
    pub flags: TagFlags,
    /// Tag body size, excluding header and footer
    pub size: u32,
}

impl TagHeader {
    /// Parse a tag header. Anything that is not a well-formed ID3v2.3/2.4
    /// header yields `None`.
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Option<Self> {
        if buf[0..3] != ID {
            return None;
        }

        let version = (buf[3], buf[4]);
        if version.0 == 0xFF || version.1 == 0xFF {
            return None;
        }
        if version.0 != 3 && version.0 != 4 {
            warn!(major = version.0, minor = version.1, "only ID3v2.3 and ID3v2.4 are supported");
            return None;
        }

        let flags = TagFlags::from_byte(buf[5]);
        let size = decode_synchsafe(&[buf[6], buf[7], buf[8], buf[9]])?;

        Some(TagHeader { version, flags, size })
    }

    pub fn major(&self) -> u8 {
        self.version.0
    }

    /// Header, body and optional footer
    pub fn total_size(&self) -> u64 {
        let footer = if self.flags.footer { HEADER_SIZE as u64 } else { 0 };
        self.size as u64 + HEADER_SIZE as u64 + footer
    }
}

/// Frame flags, `%0abc0000 %0h00kmnp`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub tag_alter_preservation: bool,
    pub file_alter_preservation: bool,
    pub read_only: bool,
    pub grouping_identity: bool,
    pub compression: bool,
    pub encryption: bool,
    pub unsynchronisation: bool,
    pub data_length_indicator: bool,
}

impl FrameFlags {
    fn from_bytes(status: u8, format: u8) -> Self {
        FrameFlags {
            tag_alter_preservation: status & 0x40 != 0,
            file_alter_preservation: status & 0x20 != 0,
            read_only: status & 0x10 != 0,
            grouping_identity: format & 0x40 != 0,
            compression: format & 0x08 != 0,
            encryption: format & 0x04 != 0,
            unsynchronisation: format & 0x02 != 0,
            data_length_indicator: format & 0x01 != 0,
        }
    }
}

/// ID3v2 frame header
///
/// `raw` always carries a synchsafe size, also for frames read from a v2.3
/// tag, so the header can be copied verbatim into a v2.4 tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: String,
    pub size: u32,
    pub flags: FrameFlags,
    pub raw: [u8; FRAME_HEADER_SIZE],
}

impl FrameHeader {
    pub fn parse(buf: &[u8; FRAME_HEADER_SIZE], tag_major: u8) -> Option<Self> {
        if !buf[0..4].iter().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
            return None;
        }
        let id: String = buf[0..4].iter().map(|&b| b as char).collect();

        let mut raw = *buf;
        let size_bytes = [buf[4], buf[5], buf[6], buf[7]];
        let size = if tag_major == 3 {
            let size = u32::from_be_bytes(size_bytes);
            if size > SYNCHSAFE_MAX {
                return None;
            }
            raw[4..8].copy_from_slice(&encode_synchsafe(size));
            size
        } else {
            decode_synchsafe(&size_bytes)?
        };

        Some(FrameHeader {
            id,
            size,
            flags: FrameFlags::from_bytes(buf[8], buf[9]),
            raw,
        })
    }

    /// Header for a freshly built frame with all flags cleared.
    pub fn new(id: &str, size: u32) -> Self {
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        for (slot, byte) in raw[0..4].iter_mut().zip(id.bytes()) {
            *slot = byte;
        }
        raw[4..8].copy_from_slice(&encode_synchsafe(size));
        FrameHeader {
            id: id.to_string(),
            size,
            flags: FrameFlags::default(),
            raw,
        }
    }

    pub fn total_size(&self) -> usize {
        self.size as usize + FRAME_HEADER_SIZE
    }
}

/// ID3v2 tag structure
#[derive(Debug)]
pub struct Id3v2Tag {
    pub header: TagHeader,
    pub frames: Vec<Frame>,
}

impl Id3v2Tag {
    /// Read the frames of a tag whose header has already been consumed.
    pub fn read_body<R: Read>(source: &mut ByteSource<R>, header: TagHeader) -> Result<Self> {
        let mut reader = TagBodyReader::new(header)?;
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame(source)? {
            frames.push(frame);
        }
        Ok(Id3v2Tag { header, frames })
    }
}

/// Reads the body of one tag a frame at a time.
#[derive(Debug)]
pub struct TagBodyReader {
    header: TagHeader,
    /// Declared body bytes not consumed yet
    remaining: usize,
    finished: bool,
}

impl TagBodyReader {
    pub fn new(header: TagHeader) -> Result<Self> {
        if header.flags.extended_header {
            return Err(SplitError::Unsupported("ID3v2 extended header".to_string()));
        }
        Ok(TagBodyReader {
            header,
            remaining: header.size as usize,
            finished: false,
        })
    }

    pub fn header(&self) -> &TagHeader {
        &self.header
    }

    /// Next frame of the body, skipping padding. `None` once the body and
    /// any footer have been consumed.
    pub fn next_frame<R: Read>(&mut self, source: &mut ByteSource<R>) -> Result<Option<Frame>> {
        while self.remaining > 0 {
            let offset = source.offset();
            let first = match source.next_byte()? {
                Some(b) => b,
                None => {
                    return Err(SplitError::Truncated {
                        offset,
                        needed: self.remaining,
                        available: 0,
                    })
                }
            };

            if first == 0 {
                if self.header.flags.footer {
                    return Err(SplitError::Unsupported(
                        "ID3v2 padding together with a footer".to_string(),
                    ));
                }
                self.remaining -= 1;
                continue;
            }

            let mut raw = [0u8; FRAME_HEADER_SIZE];
            raw[0] = first;
            raw[1..].copy_from_slice(&source.read_exact(FRAME_HEADER_SIZE - 1)?);
            let frame_header = FrameHeader::parse(&raw, self.header.major())
                .ok_or(SplitError::BadFrameHeader { offset, raw })?;

            if frame_header.total_size() > self.remaining {
                return Err(SplitError::FrameOverrun {
                    id: frame_header.id,
                    declared: frame_header.size as usize,
                    remaining: self.remaining.saturating_sub(FRAME_HEADER_SIZE),
                });
            }
            self.remaining -= frame_header.total_size();

            let data = source.read_exact(frame_header.size as usize)?;
            let frame = read_frame(frame_header, data, self.header.major())?;
            debug!(id = %frame.header.id, size = frame.header.size, "ID3v2 frame");
            return Ok(Some(frame));
        }

        if self.header.flags.footer && !self.finished {
            source.read_exact(HEADER_SIZE)?;
        }
        self.finished = true;
        Ok(None)
    }
}

/// Decode the tag at the very start of `reader`, if there is one.
pub fn read_leading_tag<R: Read>(reader: R) -> Result<Option<Id3v2Tag>> {
    let mut source = ByteSource::with_capacity(reader, 64 * 1024);
    let bytes = match source.try_read_exact(HEADER_SIZE)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    let mut buf = [0u8; HEADER_SIZE];
    buf.copy_from_slice(&bytes);

    match TagHeader::parse(&buf) {
        Some(header) => Id3v2Tag::read_body(&mut source, header).map(Some),
        None => Ok(None),
    }
}

/// Concatenate frames behind a fresh ID3v2.4 header with all flags cleared.
pub fn render_tag(frames: &[Frame]) -> Vec<u8> {
    let body_len: usize = frames.iter().map(Frame::encoded_len).sum();

    let mut out = Vec::with_capacity(HEADER_SIZE + body_len);
    out.extend_from_slice(&ID);
    out.extend_from_slice(&[4, 0, 0]);
    out.extend_from_slice(&encode_synchsafe(body_len as u32));
    for frame in frames {
        frame.write_to(&mut out);
    }
    out
}
