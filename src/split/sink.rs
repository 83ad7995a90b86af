// Destinations for rendered segments

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;
use crate::split::segment::RenderedSegment;

/// Receives each finished segment exactly once, in chapter order.
pub trait SegmentSink {
    fn write_segment(&mut self, segment: RenderedSegment) -> Result<()>;
}

impl SegmentSink for Vec<RenderedSegment> {
    fn write_segment(&mut self, segment: RenderedSegment) -> Result<()> {
        self.push(segment);
        Ok(())
    }
}

impl<S: SegmentSink + ?Sized> SegmentSink for &mut S {
    fn write_segment(&mut self, segment: RenderedSegment) -> Result<()> {
        (**self).write_segment(segment)
    }
}

/// Writes segments as files into a directory.
///
/// Each file is written to a temporary name first and renamed into place,
/// so an interrupted write never leaves a partial `.mp3` behind.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DirectorySink {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SegmentSink for DirectorySink {
    fn write_segment(&mut self, segment: RenderedSegment) -> Result<()> {
        let path = self.dir.join(segment.file_name());
        info!(path = %path.display(), bytes = segment.bytes.len(), "saving segment");

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&segment.bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        self.written.push(path);
        Ok(())
    }
}

/// Records what would be written without touching the filesystem.
#[derive(Debug, Default)]
pub struct DryRunSink {
    pub planned: Vec<(String, usize)>,
}

impl SegmentSink for DryRunSink {
    fn write_segment(&mut self, segment: RenderedSegment) -> Result<()> {
        let name = segment.file_name();
        info!(file = %name, bytes = segment.bytes.len(), "would save segment");
        self.planned.push((name, segment.bytes.len()));
        Ok(())
    }
}
