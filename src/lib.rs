//! Split a chaptered MP3 stream into one file per ID3v2 `CHAP` frame.
//!
//! Each output file gets its own ID3v2.4 tag (the source tag frames plus a
//! generated track number and chapter title) and, when the source carries a
//! Xing/Info frame, a VBR header recomputed for that file's audio frames.

use std::fs::File;
use std::io::Read;
use std::path::Path;

pub mod error;
pub mod id3;
pub mod mpeg;
pub mod options;
pub mod split;
pub mod utils;

pub use error::{ErrorKind, Result, SplitError};
pub use id3::{read_leading_tag, ChapterRecord};
pub use options::{EndOfInput, SplitOptions};
pub use split::{DirectorySink, DryRunSink, RenderedSegment, SegmentSink, Segmenter, SplitSummary};

/// Split everything `reader` yields, handing each chapter to `sink`.
pub fn split<R: Read, S: SegmentSink>(reader: R, sink: S, options: &SplitOptions) -> Result<SplitSummary> {
    Segmenter::new(reader, sink, options).run()
}

/// Split the file at `path` into `out_dir`.
pub fn split_file(path: impl AsRef<Path>, out_dir: impl AsRef<Path>, options: &SplitOptions) -> Result<SplitSummary> {
    let file = File::open(path.as_ref())?;
    let sink = DirectorySink::new(out_dir.as_ref())?;
    split(file, sink, options)
}
