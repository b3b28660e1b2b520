#![forbid(unsafe_code)]

use std::cmp::min;
use std::io::{self, Read};

use crate::error::{Error, Result};

////////////////////////////////////////////////////////////////////////////////

pub const BUFFER_SIZE: usize = 4096;

/// LSB-first bit reader over a byte stream.
pub struct BitReader<T> {
    stream: T,
    buf: Box<[u8]>,
    len: usize,
    bit_pos: usize, // index of the next unread bit in `buf`, never past 8 * len
}

impl<T: Read> BitReader<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buf: vec![0_u8; BUFFER_SIZE].into_boxed_slice(),
            len: 0,
            bit_pos: 0,
        }
    }

    // Only called once every buffered bit is consumed. Returns false at end of input.
    fn refill(&mut self) -> io::Result<bool> {
        loop {
            match self.stream.read(&mut self.buf) {
                Ok(n) => {
                    self.len = n;
                    self.bit_pos = 0;
                    return Ok(n != 0);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn is_drained(&self) -> bool {
        self.bit_pos == self.len * 8
    }

    fn ensure_bits(&mut self) -> Result<()> {
        if self.is_drained() && !self.refill()? {
            return Err(Error::UnexpectedEof);
        }
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<u32> {
        self.ensure_bits()?;
        let bit = (self.buf[self.bit_pos >> 3] >> (self.bit_pos & 7)) & 1;
        self.bit_pos += 1;
        Ok(bit.into())
    }

    /// Reads `len` bits (at most 32), first bit read ending up least significant.
    pub fn read_bits(&mut self, len: u8) -> Result<u32> {
        debug_assert!(len <= 32);

        let mut result = 0_u32;
        let mut offset = 0_usize;
        let mut left = len as usize;

        while left > 0 {
            self.ensure_bits()?;

            let low = self.bit_pos & 7;
            let take = min(8 - low, left);
            let byte = u32::from(self.buf[self.bit_pos >> 3]);

            result |= ((byte >> low) & ((1 << take) - 1)) << offset;
            offset += take;
            left -= take;
            self.bit_pos += take;
        }

        Ok(result)
    }

    /// Discards the unread bits of the current byte.
    pub fn align_to_byte(&mut self) {
        self.bit_pos = (self.bit_pos + 7) & !7;
    }

    // Up to `max` buffered bytes from the next byte boundary on; empty only at end of input.
    fn aligned_chunk(&mut self, max: usize) -> io::Result<&[u8]> {
        self.align_to_byte();
        if self.is_drained() && !self.refill()? {
            return Ok(&[]);
        }

        let start = self.bit_pos >> 3;
        let n = min(max, self.len - start);
        self.bit_pos += n * 8;
        Ok(&self.buf[start..start + n])
    }

    /// Byte-aligns and borrows up to `max` raw bytes straight out of the buffer.
    pub fn read_aligned(&mut self, max: usize) -> Result<&[u8]> {
        let chunk = self.aligned_chunk(max)?;
        if chunk.is_empty() && max > 0 {
            return Err(Error::UnexpectedEof);
        }
        Ok(chunk)
    }

    /// Byte-aligns and returns up to `n` upcoming bytes without consuming them.
    /// Fewer than `n` bytes means the input ends before that.
    pub fn peek_aligned(&mut self, n: usize) -> Result<&[u8]> {
        debug_assert!(n <= BUFFER_SIZE);
        self.align_to_byte();

        let start = self.bit_pos >> 3;
        if self.len - start < n {
            self.buf.copy_within(start..self.len, 0);
            self.len -= start;
            self.bit_pos = 0;

            while self.len < n {
                match self.stream.read(&mut self.buf[self.len..]) {
                    Ok(0) => break,
                    Ok(k) => self.len += k,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let start = self.bit_pos >> 3;
        let end = min(start + n, self.len);
        Ok(&self.buf[start..end])
    }

    /// Byte-aligns and reports whether the input has no bytes left.
    pub fn is_at_end(&mut self) -> Result<bool> {
        self.align_to_byte();
        if !self.is_drained() {
            return Ok(false);
        }
        Ok(!self.refill()?)
    }
}

// Byte-level reads start at the next byte boundary.
impl<T: Read> Read for BitReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let chunk = self.aligned_chunk(buf.len())?;
        let n = chunk.len();
        buf[..n].copy_from_slice(chunk);
        Ok(n)
    }
}

////////////////////////////////////////////////////////////////////////////////
