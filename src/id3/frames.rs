// ID3 frame definitions and parsers

use crate::error::{Result, SplitError};
use crate::id3::v2::{FrameHeader, FRAME_HEADER_SIZE};
use crate::utils::encoding::{encode_latin1, read_encoded_string, TextEncoding};

/// ID3v2 frame identifiers the splitter treats specially
pub mod frame_ids {
    pub const CHAPTER: &str = "CHAP"; // Chapter
    pub const PICTURE: &str = "APIC"; // Attached picture
    pub const USER_TEXT: &str = "TXXX"; // User defined text information
    pub const TITLE: &str = "TIT2"; // Title/songname/content description
    pub const TRACK: &str = "TRCK"; // Track number/Position in set
}

/// Decoded frame payload, chosen by frame id
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// `APIC`: only the size is kept track of
    Picture { len: usize },
    /// `TXXX`
    UserText { description: String, value: String },
    /// Any other `T***` frame
    Text(String),
    /// `CHAP`
    Chapter(ChapterRecord),
    /// Not interpreted; the raw bytes are still carried in `Frame::data`
    Opaque,
}

/// A decoded ID3v2 frame together with the exact bytes it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: FramePayload,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn id(&self) -> &str {
        &self.header.id
    }

    /// Text of a plain text frame
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            FramePayload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.data.len()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header.raw);
        out.extend_from_slice(&self.data);
    }
}

/// Contents of a `CHAP` frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    pub element_id: String,
    pub start_ms: u32,
    pub end_ms: u32,
    /// Byte offsets, `0xFFFFFFFF` when unused
    pub start_offset: u32,
    pub end_offset: u32,
    pub sub_frames: Vec<Frame>,
}

impl ChapterRecord {
    /// Text of the chapter's `TIT2` sub-frame
    pub fn title(&self) -> Option<&str> {
        self.sub_frames
            .iter()
            .find(|f| f.id() == frame_ids::TITLE)
            .and_then(Frame::text)
    }

    fn parse(data: &[u8], tag_major: u8) -> Result<Self> {
        let (element_id, next) = read_encoded_string(TextEncoding::Latin1 as u8, data, 0);
        let times = data.get(next..next + 16).ok_or_else(|| {
            SplitError::MalformedChapter(format!(
                "chapter {:?} is too short for its time fields",
                element_id
            ))
        })?;
        let word = |i: usize| u32::from_be_bytes([times[i], times[i + 1], times[i + 2], times[i + 3]]);
        let (start_ms, end_ms, start_offset, end_offset) = (word(0), word(4), word(8), word(12));

        let mut sub_frames = Vec::new();
        let mut rest = &data[next + 16..];
        while rest.len() >= FRAME_HEADER_SIZE {
            if rest[0] == 0 {
                break;
            }
            let mut raw = [0u8; FRAME_HEADER_SIZE];
            raw.copy_from_slice(&rest[..FRAME_HEADER_SIZE]);
            let header = FrameHeader::parse(&raw, tag_major).ok_or_else(|| {
                SplitError::MalformedChapter(format!(
                    "bad sub-frame header {:02X?} in chapter {:?}",
                    raw, element_id
                ))
            })?;

            let total = header.total_size();
            let body = rest.get(FRAME_HEADER_SIZE..total).ok_or_else(|| SplitError::FrameOverrun {
                id: header.id.clone(),
                declared: header.size as usize,
                remaining: rest.len() - FRAME_HEADER_SIZE,
            })?;
            sub_frames.push(read_frame(header, body.to_vec(), tag_major)?);
            rest = &rest[total..];
        }

        Ok(ChapterRecord {
            element_id,
            start_ms,
            end_ms,
            start_offset,
            end_offset,
            sub_frames,
        })
    }
}

/// Decode a frame body according to its id.
pub fn read_frame(header: FrameHeader, data: Vec<u8>, tag_major: u8) -> Result<Frame> {
    let payload = match header.id.as_str() {
        frame_ids::PICTURE => FramePayload::Picture { len: data.len() },
        frame_ids::CHAPTER => FramePayload::Chapter(ChapterRecord::parse(&data, tag_major)?),
        frame_ids::USER_TEXT => match data.first() {
            Some(&encoding) => {
                let (description, next) = read_encoded_string(encoding, &data, 1);
                let (value, _) = read_encoded_string(encoding, &data, next);
                FramePayload::UserText { description, value }
            }
            None => FramePayload::UserText {
                description: String::new(),
                value: String::new(),
            },
        },
        id if id.starts_with('T') => match data.first() {
            Some(&encoding) => FramePayload::Text(read_encoded_string(encoding, &data, 1).0),
            None => FramePayload::Text(String::new()),
        },
        _ => FramePayload::Opaque,
    };

    Ok(Frame {
        header,
        payload,
        data,
    })
}

/// Build a Latin-1 text frame.
pub fn render_frame(id: &str, text: &str) -> Frame {
    let mut data = Vec::with_capacity(text.len() + 2);
    data.push(TextEncoding::Latin1 as u8);
    data.extend(encode_latin1(text));
    data.push(0);

    Frame {
        header: FrameHeader::new(id, data.len() as u32),
        payload: FramePayload::Text(text.to_string()),
        data,
    }
}
