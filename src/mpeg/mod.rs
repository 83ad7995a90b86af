// MPEG audio frame handling module
pub mod header;
pub mod xing;

pub use header::{ChannelMode, Layer, MpegFrameHeader, MpegVersion};
pub use xing::{build_toc, VbrFrame};
