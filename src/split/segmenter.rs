// Chapter segmentation state machine

use std::io::Read;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SplitError};
use crate::id3::frames::{frame_ids, ChapterRecord, Frame, FramePayload};
use crate::id3::v2::{TagBodyReader, TagHeader, HEADER_SIZE};
use crate::mpeg::{MpegFrameHeader, VbrFrame};
use crate::options::{EndOfInput, SplitOptions};
use crate::split::segment::Segment;
use crate::split::sink::SegmentSink;
use crate::utils::ByteSource;

const TAG_START: u8 = b'I';
const SYNC_BYTE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for a tag or frame sync candidate
    Scanning,
    /// Between the frames of an accepted tag
    InTag,
    InAudio,
    /// End of input reached or the run aborted; no more input is read
    Finished,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub segments: usize,
    pub audio_frames: u64,
    pub chapters: usize,
    pub vbr_frame: bool,
    /// The input ended inside a tag or frame and the rest was dropped
    pub truncated: bool,
}

/// Drives a byte stream through tag and frame decoding and hands one
/// rendered segment per chapter to the sink.
///
/// Chapter `n` runs until the cumulative sample count passes its end time;
/// the last chapter runs to the end of the stream.
pub struct Segmenter<R, S> {
    source: ByteSource<R>,
    sink: S,
    end_of_input: EndOfInput,
    state: ScanState,
    chapters: Vec<ChapterRecord>,
    /// Source tag frames for the first output file
    first_frames: Vec<Frame>,
    /// Source tag frames for every later output file
    next_frames: Vec<Frame>,
    vbr: Option<Rc<VbrFrame>>,
    /// Body of the tag being read while in `InTag`
    tag: Option<TagBodyReader>,
    next_chapter: usize,
    sample_position: u64,
    /// `end_ms * sample_rate` of the open chapter; compared against
    /// `sample_position * 1000` so no rounding is involved
    boundary: Option<u64>,
    segment: Option<Segment>,
    summary: SplitSummary,
}

impl<R: Read, S: SegmentSink> Segmenter<R, S> {
    pub fn new(reader: R, sink: S, options: &SplitOptions) -> Self {
        Segmenter {
            source: ByteSource::with_capacity(reader, options.buffer_capacity),
            sink,
            end_of_input: options.end_of_input,
            state: ScanState::Scanning,
            chapters: Vec::new(),
            first_frames: Vec::new(),
            next_frames: Vec::new(),
            vbr: None,
            tag: None,
            next_chapter: 0,
            sample_position: 0,
            boundary: None,
            segment: None,
            summary: SplitSummary::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Chapters collected so far, in stream order
    pub fn chapters(&self) -> &[ChapterRecord] {
        &self.chapters
    }

    pub fn summary(&self) -> &SplitSummary {
        &self.summary
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Process the whole stream.
    pub fn run(&mut self) -> Result<SplitSummary> {
        while self.step()? {}
        Ok(self.summary.clone())
    }

    /// Consume one scan byte and any audio frame it starts, a tag header,
    /// or the next frame of the tag being read.
    ///
    /// Returns `false` once the stream is finished. After an error the
    /// segmenter is finished too and the open segment is discarded.
    pub fn step(&mut self) -> Result<bool> {
        if self.state == ScanState::Finished {
            return Ok(false);
        }

        let result = if self.state == ScanState::InTag {
            self.read_tag_frame()
        } else {
            self.scan()
        };
        match result {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.finish()?;
                Ok(false)
            }
            Err(e) if e.is_truncation() && self.end_of_input == EndOfInput::Truncate => {
                warn!(error = %e, "input ends inside a tag or frame, dropping it");
                self.summary.truncated = true;
                self.tag = None;
                self.finish()?;
                Ok(false)
            }
            Err(e) => {
                self.state = ScanState::Finished;
                self.tag = None;
                self.segment = None;
                Err(e)
            }
        }
    }

    /// `Ok(false)` at end of input
    fn scan(&mut self) -> Result<bool> {
        match self.source.next_byte()? {
            None => Ok(false),
            Some(TAG_START) => self.try_tag().map(|_| true),
            Some(SYNC_BYTE) => self.try_audio_frame().map(|_| true),
            Some(_) => Ok(true),
        }
    }

    fn read_tag_frame(&mut self) -> Result<bool> {
        let reader = match self.tag.as_mut() {
            Some(reader) => reader,
            None => {
                self.state = ScanState::Scanning;
                return Ok(true);
            }
        };
        match reader.next_frame(&mut self.source)? {
            Some(frame) => self.route_frame(frame),
            None => {
                self.tag = None;
                self.state = ScanState::Scanning;
            }
        }
        Ok(true)
    }

    fn try_tag(&mut self) -> Result<()> {
        let offset = self.source.offset() - 1;
        // a candidate cut off by end of input is just trailing bytes
        let rest = match self.source.try_read_exact(HEADER_SIZE - 1)? {
            Some(rest) => rest,
            None => return Ok(()),
        };
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = TAG_START;
        buf[1..].copy_from_slice(&rest);

        let header = match TagHeader::parse(&buf) {
            Some(header) => header,
            None => {
                debug!(offset, "not an ID3v2 tag header, skipped");
                self.state = ScanState::Scanning;
                return Ok(());
            }
        };

        debug!(offset, version = ?header.version, size = header.size, "ID3v2 tag");
        self.tag = Some(TagBodyReader::new(header)?);
        self.state = ScanState::InTag;
        Ok(())
    }

    fn route_frame(&mut self, frame: Frame) {
        let Frame {
            header,
            payload,
            data,
        } = frame;

        match payload {
            FramePayload::Chapter(chapter) => {
                debug!(
                    element_id = %chapter.element_id,
                    start_ms = chapter.start_ms,
                    end_ms = chapter.end_ms,
                    title = ?chapter.title(),
                    "chapter"
                );
                self.chapters.push(chapter);
                self.summary.chapters = self.chapters.len();
            }
            payload => {
                let frame = Frame {
                    header,
                    payload,
                    data,
                };
                // numbering frames are regenerated for every output file
                let regenerated = frame.id() == frame_ids::TRACK || frame.id() == frame_ids::TITLE;
                if frame.id() == frame_ids::PICTURE {
                    self.first_frames.push(frame);
                } else if !regenerated {
                    self.next_frames.push(frame.clone());
                    self.first_frames.push(frame);
                }
            }
        }
    }

    fn try_audio_frame(&mut self) -> Result<()> {
        let rest = match self.source.try_read_exact(MpegFrameHeader::SIZE - 1)? {
            Some(rest) => rest,
            None => return Ok(()),
        };
        let raw = [SYNC_BYTE, rest[0], rest[1], rest[2]];

        let header = match MpegFrameHeader::parse(&raw)? {
            Some(header) => header,
            None => {
                // the sync byte stays consumed, the other three are scanned again
                self.source.rewind(MpegFrameHeader::SIZE - 1)?;
                return Ok(());
            }
        };

        self.state = ScanState::InAudio;
        let payload = self.source.read_exact(header.payload_len())?;

        if header.is_vbr_marker(&payload) {
            if self.vbr.is_none() {
                debug!(offset = self.source.offset(), size = header.frame_size, "VBR frame captured");
                self.vbr = Some(Rc::new(VbrFrame::new(header, payload)));
                self.summary.vbr_frame = true;
            }
            return Ok(());
        }

        let crossed = match self.boundary {
            None => true,
            Some(boundary) => self.sample_position * 1000 > boundary,
        };
        if crossed {
            self.open_next_chapter(&header)?;
        }

        let segment = self.segment.as_mut().ok_or(SplitError::MissingChapters)?;
        segment.push(&header, payload);
        self.sample_position += header.samples_per_frame as u64;
        self.summary.audio_frames += 1;
        Ok(())
    }

    fn open_next_chapter(&mut self, header: &MpegFrameHeader) -> Result<()> {
        if self.chapters.is_empty() {
            return Err(SplitError::MissingChapters);
        }
        if self.next_chapter >= self.chapters.len() {
            return Ok(());
        }

        if let Some(done) = self.segment.take() {
            self.emit(done)?;
        }

        let index = self.next_chapter;
        let chapter = self.chapters[index].clone();
        self.boundary = Some(chapter.end_ms as u64 * header.sample_rate as u64);
        let inherited = if index == 0 {
            &self.first_frames
        } else {
            &self.next_frames
        };
        debug!(index, sample_position = self.sample_position, "chapter opened");
        self.segment = Some(Segment::new(index, chapter, inherited, self.vbr.clone()));
        self.next_chapter += 1;
        Ok(())
    }

    fn emit(&mut self, segment: Segment) -> Result<()> {
        let rendered = segment.finalize(self.chapters.len());
        info!(
            file = %rendered.file_name(),
            frames = rendered.frame_count,
            bytes = rendered.bytes.len(),
            "segment complete"
        );
        self.summary.segments += 1;
        self.sink.write_segment(rendered)
    }

    fn finish(&mut self) -> Result<()> {
        self.state = ScanState::Finished;
        match self.segment.take() {
            Some(segment) => self.emit(segment),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frames::render_frame;
    use crate::id3::v2::{render_tag, FrameHeader};
    use crate::split::segment::RenderedSegment;
    use std::io::Cursor;

    const FRAME: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn chap(id: &str, end_ms: u32) -> Frame {
        let mut body = id.as_bytes().to_vec();
        body.push(0);
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&end_ms.to_be_bytes());
        body.extend_from_slice(&[0xFF; 8]);
        crate::id3::frames::read_frame(FrameHeader::new("CHAP", body.len() as u32), body, 4).unwrap()
    }

    fn audio(count: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..count {
            out.extend_from_slice(&FRAME);
            out.extend_from_slice(&[0u8; 413]);
        }
        out
    }

    #[test]
    fn test_single_chapter_takes_everything() {
        let mut stream = render_tag(&[chap("c0", 100), render_frame("TALB", "Album")]);
        stream.extend(audio(10));

        let mut segmenter = Segmenter::new(Cursor::new(stream), Vec::new(), &SplitOptions::default());
        assert_eq!(segmenter.state(), ScanState::Scanning);
        let summary = segmenter.run().unwrap();
        assert_eq!(segmenter.state(), ScanState::Finished);
        assert!(!segmenter.step().unwrap());
        let out: Vec<RenderedSegment> = segmenter.into_sink();

        assert_eq!(summary.segments, 1);
        assert_eq!(summary.audio_frames, 10);
        assert_eq!(summary.chapters, 1);
        assert_eq!(out[0].frame_count, 10);
        assert_eq!(out[0].total, 1);
    }

    #[test]
    fn test_step_by_step_states() {
        let mut stream = render_tag(&[chap("c0", 100)]);
        stream.extend(audio(1));

        let mut segmenter = Segmenter::new(Cursor::new(stream), Vec::new(), &SplitOptions::default());
        // tag header
        assert!(segmenter.step().unwrap());
        assert_eq!(segmenter.state(), ScanState::InTag);
        assert!(segmenter.chapters().is_empty());

        // CHAP frame
        assert!(segmenter.step().unwrap());
        assert_eq!(segmenter.state(), ScanState::InTag);
        assert_eq!(segmenter.chapters().len(), 1);

        // end of the tag body
        assert!(segmenter.step().unwrap());
        assert_eq!(segmenter.state(), ScanState::Scanning);

        assert!(segmenter.step().unwrap());
        assert_eq!(segmenter.state(), ScanState::InAudio);
        assert!(!segmenter.step().unwrap());
        assert_eq!(segmenter.into_sink().len(), 1);
    }

    #[test]
    fn test_route_frames() {
        let picture = crate::id3::frames::read_frame(FrameHeader::new("APIC", 4), vec![0u8; 4], 4).unwrap();
        let mut segmenter = Segmenter::new(Cursor::new(Vec::new()), Vec::new(), &SplitOptions::default());
        segmenter.route_frame(render_frame("TRCK", "3/9"));
        segmenter.route_frame(render_frame("TIT2", "Whole"));
        segmenter.route_frame(picture);
        segmenter.route_frame(render_frame("TPE1", "Artist"));
        segmenter.route_frame(chap("c0", 10));

        let ids = |frames: &[Frame]| frames.iter().map(|f| f.id().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&segmenter.first_frames), vec!["APIC", "TPE1"]);
        assert_eq!(ids(&segmenter.next_frames), vec!["TPE1"]);
        assert_eq!(segmenter.chapters().len(), 1);
    }

    #[test]
    fn test_error_discards_open_segment() {
        let mut stream = render_tag(&[chap("c0", 100)]);
        stream.extend(audio(3));
        // MPEG 2.5 header
        stream.extend_from_slice(&[0xFF, 0xE3, 0x90, 0x00]);

        let mut out: Vec<RenderedSegment> = Vec::new();
        let err = Segmenter::new(Cursor::new(stream), &mut out, &SplitOptions::default())
            .run()
            .unwrap_err();
        assert!(matches!(err, SplitError::Unsupported(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_candidates_end_the_stream() {
        let mut stream = render_tag(&[chap("c0", 100)]);
        stream.extend(audio(2));
        stream.extend_from_slice(&[0xFF, 0xFB]);

        let mut out: Vec<RenderedSegment> = Vec::new();
        let summary = Segmenter::new(Cursor::new(stream), &mut out, &SplitOptions::default())
            .run()
            .unwrap();
        assert!(!summary.truncated);
        assert_eq!(out[0].frame_count, 2);
    }
}
