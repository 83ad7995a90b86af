// Per-chapter output accumulation

use std::rc::Rc;

use crate::id3::frames::{frame_ids, render_frame, ChapterRecord, Frame};
use crate::id3::v2::render_tag;
use crate::mpeg::{MpegFrameHeader, VbrFrame};

/// Audio collected for one chapter, waiting to be rendered.
#[derive(Debug)]
pub struct Segment {
    index: usize,
    chapter: ChapterRecord,
    tag_frames: Vec<Frame>,
    blocks: Vec<Vec<u8>>,
    frame_sizes: Vec<usize>,
    vbr: Option<Rc<VbrFrame>>,
}

impl Segment {
    /// Open the segment for chapter `index`.
    ///
    /// `inherited` are the source tag frames carried into this file; the
    /// track number and chapter title are added when it is finalized.
    pub fn new(index: usize, chapter: ChapterRecord, inherited: &[Frame], vbr: Option<Rc<VbrFrame>>) -> Self {
        Segment {
            index,
            chapter,
            tag_frames: inherited.to_vec(),
            blocks: Vec::new(),
            frame_sizes: Vec::new(),
            vbr,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn chapter(&self) -> &ChapterRecord {
        &self.chapter
    }

    pub fn frame_count(&self) -> usize {
        self.frame_sizes.len()
    }

    pub fn byte_count(&self) -> usize {
        self.frame_sizes.iter().sum()
    }

    pub fn push(&mut self, header: &MpegFrameHeader, payload: Vec<u8>) {
        let mut block = Vec::with_capacity(MpegFrameHeader::SIZE + payload.len());
        block.extend_from_slice(&header.raw);
        block.extend(payload);
        self.blocks.push(block);
        self.frame_sizes.push(header.frame_size);
    }

    /// Tag, then the rewritten VBR frame if one was captured, then the audio.
    ///
    /// `total` is the number of chapters known when the segment is written;
    /// a tag read after this segment opened can still add to it.
    pub fn finalize(mut self, total: usize) -> RenderedSegment {
        self.tag_frames.push(render_frame(
            frame_ids::TRACK,
            &format!("{}/{}", self.index + 1, total),
        ));
        if let Some(title) = self.chapter.title() {
            self.tag_frames.push(render_frame(frame_ids::TITLE, title));
        }
        let tag = render_tag(&self.tag_frames);
        let vbr = self.vbr.as_ref().map(|frame| frame.rewrite(&self.frame_sizes));

        let len = tag.len()
            + vbr.as_ref().map_or(0, Vec::len)
            + self.blocks.iter().map(Vec::len).sum::<usize>();
        let mut bytes = Vec::with_capacity(len);
        bytes.extend_from_slice(&tag);
        if let Some(vbr) = &vbr {
            bytes.extend_from_slice(vbr);
        }
        for block in &self.blocks {
            bytes.extend_from_slice(block);
        }

        RenderedSegment {
            index: self.index,
            total,
            title: self.chapter.title().map(str::to_string),
            frame_count: self.frame_sizes.len(),
            bytes,
        }
    }
}

/// One finished output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSegment {
    /// 0-based chapter index
    pub index: usize,
    pub total: usize,
    pub title: Option<String>,
    pub frame_count: usize,
    pub bytes: Vec<u8>,
}

impl RenderedSegment {
    /// `001.mp3`, or `001-<title>.mp3` when the chapter has a title.
    /// An empty title is dropped from the name.
    pub fn file_name(&self) -> String {
        let number = format!("{:03}", self.index + 1);
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => {
                let title: String = title
                    .chars()
                    .map(|c| match c {
                        '/' | '\\' | '\0' => '_',
                        c => c,
                    })
                    .collect();
                format!("{}-{}.mp3", number, title)
            }
            _ => format!("{}.mp3", number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frames::{read_frame, FramePayload};
    use crate::id3::v2::{read_leading_tag, FrameHeader};
    use std::io::Cursor;

    fn chapter(title: Option<&str>) -> ChapterRecord {
        ChapterRecord {
            element_id: "chp".to_string(),
            start_ms: 0,
            end_ms: 1000,
            start_offset: u32::MAX,
            end_offset: u32::MAX,
            sub_frames: title
                .map(|t| vec![render_frame(frame_ids::TITLE, t)])
                .unwrap_or_default(),
        }
    }

    fn audio_header() -> MpegFrameHeader {
        MpegFrameHeader::parse(&[0xFF, 0xFB, 0x90, 0x00]).unwrap().unwrap()
    }

    #[test]
    fn test_generated_frames() {
        let artist = read_frame(FrameHeader::new("TPE1", 3), b"\x00A\x00".to_vec(), 4).unwrap();
        let segment = Segment::new(1, chapter(Some("Middle")), &[artist], None);
        assert_eq!(segment.tag_frames.len(), 1);

        let rendered = segment.finalize(3);
        assert_eq!(rendered.total, 3);
        let tag = read_leading_tag(Cursor::new(rendered.bytes.as_slice())).unwrap().unwrap();
        let ids: Vec<&str> = tag.frames.iter().map(Frame::id).collect();
        assert_eq!(ids, vec!["TPE1", "TRCK", "TIT2"]);
        assert_eq!(tag.frames[1].payload, FramePayload::Text("2/3".to_string()));
        assert_eq!(tag.frames[2].text(), Some("Middle"));
    }

    #[test]
    fn test_finalize_without_vbr() {
        let header = audio_header();
        let mut segment = Segment::new(0, chapter(None), &[], None);
        segment.push(&header, vec![0u8; header.payload_len()]);
        segment.push(&header, vec![0u8; header.payload_len()]);
        assert_eq!(segment.frame_count(), 2);
        assert_eq!(segment.byte_count(), 834);

        let rendered = segment.finalize(1);
        // tag: header + TRCK "1/1"
        let tag_len = 10 + 10 + 5;
        assert_eq!(rendered.bytes.len(), tag_len + 834);
        assert_eq!(&rendered.bytes[..3], b"ID3");
        assert_eq!(&rendered.bytes[tag_len..tag_len + 4], &header.raw);
        assert_eq!(rendered.frame_count, 2);
        assert_eq!(rendered.file_name(), "001.mp3");
    }

    #[test]
    fn test_finalize_with_vbr() {
        let header = audio_header();
        let mut vbr_payload = vec![0u8; header.payload_len()];
        vbr_payload[32..36].copy_from_slice(b"Info");
        let vbr = Rc::new(VbrFrame::new(header, vbr_payload));

        let mut segment = Segment::new(0, chapter(Some("Intro")), &[], Some(vbr.clone()));
        segment.push(&header, vec![1u8; header.payload_len()]);
        let rendered = segment.finalize(1);

        let tag_len = 10 + (10 + 5) + (10 + 7);
        assert_eq!(rendered.bytes.len(), tag_len + 417 + 417);
        let vbr_out = &rendered.bytes[tag_len..tag_len + 417];
        assert_eq!(&vbr_out[36..40], b"Info");
        assert_eq!(&vbr_out[44..48], &1u32.to_be_bytes());
        assert_eq!(rendered.bytes[tag_len + 417 + 4], 1);
    }

    #[test]
    fn test_file_name() {
        let mut rendered = RenderedSegment {
            index: 6,
            total: 12,
            title: Some("AC/DC".to_string()),
            frame_count: 0,
            bytes: Vec::new(),
        };
        assert_eq!(rendered.file_name(), "007-AC_DC.mp3");
        rendered.index = 1233;
        rendered.title = None;
        assert_eq!(rendered.file_name(), "1234.mp3");
        rendered.index = 0;
        rendered.title = Some(String::new());
        assert_eq!(rendered.file_name(), "001.mp3");
    }
}
