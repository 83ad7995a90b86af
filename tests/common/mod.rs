//! Synthetic chaptered MP3 streams for integration tests
//!
//! Audio frames are MPEG1 Layer III, 128 kbit/s, 44.1 kHz: 417 bytes and
//! 1152 samples each, with an all-zero payload.

#![allow(dead_code)]

use std::io::Cursor;

use chapsplit::id3::v2::encode_synchsafe;
use chapsplit::id3::Id3v2Tag;
use chapsplit::read_leading_tag;

pub const CBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
pub const FRAME_SIZE: usize = 417;
pub const SAMPLES_PER_FRAME: u64 = 1152;
pub const SAMPLE_RATE: u64 = 44100;
/// Marker offset for MPEG1 stereo
pub const VBR_OFFSET: usize = 32;

// ============================================================================
// ID3v2 building
// ============================================================================

/// One frame with a size field in the encoding of the given tag version
pub fn id3_frame(major: u8, id: &str, body: &[u8]) -> Vec<u8> {
    let size = body.len() as u32;
    let size_bytes = if major == 3 {
        size.to_be_bytes()
    } else {
        encode_synchsafe(size)
    };
    let mut out = id.as_bytes().to_vec();
    out.extend_from_slice(&size_bytes);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(body);
    out
}

/// Latin-1 text frame
pub fn text_frame(major: u8, id: &str, text: &str) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend_from_slice(text.as_bytes());
    body.push(0);
    id3_frame(major, id, &body)
}

/// `CHAP` frame, with a `TIT2` sub-frame when a title is given
pub fn chap_frame(major: u8, element_id: &str, start_ms: u32, end_ms: u32, title: Option<&str>) -> Vec<u8> {
    let mut body = element_id.as_bytes().to_vec();
    body.push(0);
    body.extend_from_slice(&start_ms.to_be_bytes());
    body.extend_from_slice(&end_ms.to_be_bytes());
    body.extend_from_slice(&[0xFF; 8]);
    if let Some(title) = title {
        body.extend(text_frame(major, "TIT2", title));
    }
    id3_frame(major, "CHAP", &body)
}

/// Full tag around `frames`, followed by `padding` zero bytes inside the tag
pub fn tag_with_padding(major: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
    let body: Vec<u8> = frames.concat();
    let mut out = b"ID3".to_vec();
    out.extend_from_slice(&[major, 0, 0]);
    out.extend_from_slice(&encode_synchsafe((body.len() + padding) as u32));
    out.extend(body);
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}

pub fn tag(major: u8, frames: &[Vec<u8>]) -> Vec<u8> {
    tag_with_padding(major, frames, 0)
}

/// Two titled chapters, split at 5 seconds
pub fn two_chapter_tag() -> Vec<u8> {
    tag(
        4,
        &[
            text_frame(4, "TALB", "Book"),
            chap_frame(4, "chp0", 0, 5000, Some("Intro")),
            chap_frame(4, "chp1", 5000, 10000, Some("Outro")),
        ],
    )
}

// ============================================================================
// Audio building
// ============================================================================

pub fn audio_frames(count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count * FRAME_SIZE);
    for _ in 0..count {
        out.extend_from_slice(&CBR_HEADER);
        out.extend(std::iter::repeat(0u8).take(FRAME_SIZE - 4));
    }
    out
}

/// VBR summary frame with all fields flagged and zeroed
pub fn vbr_frame(marker: &[u8; 4]) -> Vec<u8> {
    let mut out = CBR_HEADER.to_vec();
    let mut payload = vec![0u8; FRAME_SIZE - 4];
    payload[VBR_OFFSET..VBR_OFFSET + 4].copy_from_slice(marker);
    payload[VBR_OFFSET + 4..VBR_OFFSET + 8].copy_from_slice(&0x0Fu32.to_be_bytes());
    out.extend(payload);
    out
}

// ============================================================================
// Output inspection
// ============================================================================

pub fn read_be_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Decode the tag at the start of a rendered segment and return it with
/// the bytes that follow it.
pub fn split_output(bytes: &[u8]) -> (Id3v2Tag, &[u8]) {
    let tag = read_leading_tag(Cursor::new(bytes))
        .expect("output tag decodes")
        .expect("output starts with a tag");
    let len = tag.header.total_size() as usize;
    (tag, &bytes[len..])
}

pub fn frame_ids(tag: &Id3v2Tag) -> Vec<String> {
    tag.frames.iter().map(|f| f.id().to_string()).collect()
}

pub fn text_of<'a>(tag: &'a Id3v2Tag, id: &str) -> Option<&'a str> {
    tag.frames.iter().find(|f| f.id() == id).and_then(|f| f.text())
}
