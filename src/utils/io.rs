// Buffered byte source with single-step backtracking

use std::io::{self, Read};

use crate::error::{Result, SplitError};
use crate::options::DEFAULT_BUFFER_CAPACITY;

/// Sequential reader over a byte stream.
///
/// Owns one working buffer holding a window of the stream. `pos` is the read
/// cursor and `avail` the number of unread bytes after it; `pos + avail`
/// never exceeds the buffer length. Refills compact the unread tail to the
/// start of the buffer first, so unread bytes are never dropped.
pub struct ByteSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    avail: usize,
    /// Length of the most recent read, i.e. how far `rewind` may go.
    last_read: usize,
    consumed: u64,
    eof: bool,
}

impl<R: Read> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        ByteSource {
            inner,
            buf: vec![0u8; capacity.max(1)],
            pos: 0,
            avail: 0,
            last_read: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Number of bytes consumed from the stream so far.
    pub fn offset(&self) -> u64 {
        self.consumed
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Read the next byte, or `None` at end of input.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.avail == 0 && !self.fill(1)? {
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.advance(1);
        Ok(Some(byte))
    }

    /// Read exactly `n` bytes, or `None` if the input ends first.
    ///
    /// Nothing is consumed when `None` is returned.
    pub fn try_read_exact(&mut self, n: usize) -> Result<Option<Vec<u8>>> {
        if self.avail < n && !self.fill(n)? {
            return Ok(None);
        }
        let bytes = self.buf[self.pos..self.pos + n].to_vec();
        self.advance(n);
        Ok(Some(bytes))
    }

    /// Read exactly `n` bytes; running out of input is a truncation error.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let offset = self.consumed;
        match self.try_read_exact(n)? {
            Some(bytes) => Ok(bytes),
            None => Err(SplitError::Truncated {
                offset,
                needed: n,
                available: self.avail,
            }),
        }
    }

    /// Un-consume the last `n` bytes of the most recent read.
    ///
    /// Only valid once, directly after that read.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.last_read {
            return Err(SplitError::InvalidRewind {
                requested: n,
                available: self.last_read,
            });
        }
        self.pos -= n;
        self.avail += n;
        self.consumed -= n as u64;
        self.last_read = 0;
        Ok(())
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
        self.avail -= n;
        self.consumed += n as u64;
        self.last_read = n;
    }

    /// Make at least `n` unread bytes available. Returns `false` when the
    /// stream ends first; whatever was buffered stays buffered.
    fn fill(&mut self, n: usize) -> Result<bool> {
        self.last_read = 0;
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.pos + self.avail, 0);
            self.pos = 0;
        }
        if n > self.buf.len() {
            self.buf.resize(n, 0);
        }

        while self.avail < n && !self.eof {
            let start = self.avail;
            match self.inner.read(&mut self.buf[start..]) {
                Ok(0) => self.eof = true,
                Ok(read) => self.avail += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(self.avail >= n)
    }
}
