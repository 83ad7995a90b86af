// Run configuration for the splitter

/// Working buffer size used by the byte source unless overridden.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10 * 1024 * 1024;

/// What to do when the input ends in the middle of a tag or audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfInput {
    /// Abort the run with a truncated-input error.
    #[default]
    Fail,
    /// Drop the cut-off structure, log a warning and finish the open segment.
    Truncate,
}

/// Options for a single split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    pub buffer_capacity: usize,
    pub end_of_input: EndOfInput,
}

impl Default for SplitOptions {
    fn default() -> Self {
        SplitOptions {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            end_of_input: EndOfInput::Fail,
        }
    }
}

impl SplitOptions {
    pub fn lenient() -> Self {
        SplitOptions {
            end_of_input: EndOfInput::Truncate,
            ..Self::default()
        }
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}
