// Error types for the splitter core

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Bad ID3v2 frame header at offset {offset}: {raw:02X?}")]
    BadFrameHeader { offset: u64, raw: [u8; 10] },

    #[error("ID3v2 frame {id} declares {declared} bytes but only {remaining} remain in its container")]
    FrameOverrun {
        id: String,
        declared: usize,
        remaining: usize,
    },

    #[error("Malformed CHAP frame: {0}")]
    MalformedChapter(String),

    #[error("No chapter information found in ID3v2 tag")]
    MissingChapters,

    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("Cannot rewind {requested} bytes: only {available} bytes were just read")]
    InvalidRewind { requested: usize, available: usize },
}

/// Fatal error classes a run can abort with.
///
/// A malformed tag header is deliberately absent: it is not an error, the
/// candidate is just not treated as a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFeature,
    StructuralViolation,
    TruncatedInput,
    Io,
}

impl SplitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SplitError::Io(_) => ErrorKind::Io,
            SplitError::Unsupported(_) => ErrorKind::UnsupportedFeature,
            SplitError::BadFrameHeader { .. }
            | SplitError::FrameOverrun { .. }
            | SplitError::MalformedChapter(_)
            | SplitError::MissingChapters
            | SplitError::InvalidRewind { .. } => ErrorKind::StructuralViolation,
            SplitError::Truncated { .. } => ErrorKind::TruncatedInput,
        }
    }

    pub fn is_truncation(&self) -> bool {
        self.kind() == ErrorKind::TruncatedInput
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert_eq!(SplitError::MissingChapters.kind(), ErrorKind::StructuralViolation);
        assert_eq!(
            SplitError::Unsupported("MPEG 2.5".into()).kind(),
            ErrorKind::UnsupportedFeature
        );
        let truncated = SplitError::Truncated { offset: 12, needed: 10, available: 3 };
        assert!(truncated.is_truncation());
        assert_eq!(
            truncated.to_string(),
            "Unexpected end of input at offset 12: needed 10 bytes, 3 available"
        );
    }
}
