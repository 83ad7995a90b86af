// Chapter splitting: segmentation, segment rendering and output sinks
pub mod segment;
pub mod segmenter;
pub mod sink;

pub use segment::{RenderedSegment, Segment};
pub use segmenter::{ScanState, Segmenter, SplitSummary};
pub use sink::{DirectorySink, DryRunSink, SegmentSink};
