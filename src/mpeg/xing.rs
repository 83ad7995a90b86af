// VBR ("Xing"/"Info") summary frames
//
// Layout at the marker offset inside the frame payload:
//   marker(4) flags(4) frames(4) bytes(4) toc(100)
//
// Reference:
// - http://gabriel.mp3-tech.org/mp3infotag.html

use tracing::warn;

use crate::mpeg::header::MpegFrameHeader;

pub const TOC_ENTRIES: usize = 100;

const FLAG_FRAMES: u32 = 0x1;
const FLAG_BYTES: u32 = 0x2;
const FLAG_TOC: u32 = 0x4;

const FLAGS_AT: usize = 4;
const FRAMES_AT: usize = 8;
const BYTES_AT: usize = 12;
const TOC_AT: usize = 16;

/// The VBR summary frame captured from the source stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbrFrame {
    pub header: MpegFrameHeader,
    pub payload: Vec<u8>,
}

impl VbrFrame {
    pub fn new(header: MpegFrameHeader, payload: Vec<u8>) -> Self {
        VbrFrame { header, payload }
    }

    /// Render a copy of this frame whose counts and seek table describe the
    /// audio frames in `frame_sizes`. The captured frame is left untouched.
    pub fn rewrite(&self, frame_sizes: &[usize]) -> Vec<u8> {
        let offset = self.header.vbr_offset;
        let mut payload = self.payload.clone();

        if payload.len() >= offset + TOC_AT {
            let frame_count = frame_sizes.len() as u32;
            let byte_count: u64 = frame_sizes.iter().map(|&s| s as u64).sum();
            let toc = build_toc(frame_sizes);
            let use_toc = toc.len() == TOC_ENTRIES && payload.len() >= offset + TOC_AT + TOC_ENTRIES;

            let mut flags = FLAG_FRAMES | FLAG_BYTES;
            if use_toc {
                flags |= FLAG_TOC;
            }
            write_be_u32(&mut payload, offset + FLAGS_AT, flags);
            write_be_u32(&mut payload, offset + FRAMES_AT, frame_count);
            write_be_u32(&mut payload, offset + BYTES_AT, u32::try_from(byte_count).unwrap_or(u32::MAX));
            if use_toc {
                payload[offset + TOC_AT..offset + TOC_AT + TOC_ENTRIES].copy_from_slice(&toc);
            }
        } else {
            warn!(
                payload_len = payload.len(),
                offset, "VBR frame too short for frame and byte counts, copied unchanged"
            );
        }

        let mut out = Vec::with_capacity(MpegFrameHeader::SIZE + payload.len());
        out.extend_from_slice(&self.header.raw);
        out.extend_from_slice(&payload);
        out
    }
}

fn write_be_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

/// Seek table for a run of audio frames.
///
/// Entry `k` is taken at the first frame whose index reaches
/// `k * frames / 100`, kept as an exact fraction so every bucket gets an
/// entry even when the frame count is not a multiple of 100. Fewer than
/// 100 frames give fewer than 100 entries.
pub fn build_toc(frame_sizes: &[usize]) -> Vec<u8> {
    let count = frame_sizes.len() as u64;
    let total: u64 = frame_sizes.iter().map(|&s| s as u64).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut toc = Vec::with_capacity(TOC_ENTRIES);
    let mut before = 0u64;
    for (index, &size) in frame_sizes.iter().enumerate() {
        if index as u64 * TOC_ENTRIES as u64 >= toc.len() as u64 * count {
            toc.push((255 * before / total) as u8);
        }
        before += size as u64;
    }
    toc
}
