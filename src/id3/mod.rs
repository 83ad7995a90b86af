// ID3v2 tag handling module
pub mod frames;
pub mod v2;

pub use frames::{frame_ids, read_frame, render_frame, ChapterRecord, Frame, FramePayload};
pub use v2::{read_leading_tag, render_tag, FrameHeader, Id3v2Tag, TagBodyReader, TagFlags, TagHeader};
