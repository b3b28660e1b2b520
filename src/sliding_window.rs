#![forbid(unsafe_code)]

use std::cmp::min;
use std::io::Write;

use crate::crc32::Crc32;
use crate::error::{Error, Result};

////////////////////////////////////////////////////////////////////////////////

pub const WINDOW_SIZE: usize = 32 * (1 << 10);
const WINDOW_MASK: u64 = WINDOW_SIZE as u64 - 1;

/// History of the last `WINDOW_SIZE` output bytes.
///
/// Byte number `p` of the output lives at `data[p % WINDOW_SIZE]`. Whenever the
/// position crosses a multiple of `WINDOW_SIZE` the whole window is written to
/// the inner stream and folded into the running CRC-32; `finish` does the same
/// for the last partial window.
pub struct SlidingWindow<T> {
    inner: T,
    data: Box<[u8]>,
    position: u64,
    crc: Crc32,
}

impl<T: Write> SlidingWindow<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            data: vec![0_u8; WINDOW_SIZE].into_boxed_slice(),
            position: 0,
            crc: Crc32::new(),
        }
    }

    fn offset(&self) -> usize {
        (self.position & WINDOW_MASK) as usize
    }

    fn flush_window(&mut self, len: usize) -> Result<()> {
        let pending = &self.data[..len];
        self.inner.write_all(pending)?;
        self.crc.update(pending);
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        let offset = self.offset();
        self.data[offset] = byte;
        self.position += 1;

        if offset == WINDOW_SIZE - 1 {
            self.flush_window(WINDOW_SIZE)?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let offset = self.offset();
            let n = min(bytes.len(), WINDOW_SIZE - offset);

            self.data[offset..offset + n].copy_from_slice(&bytes[..n]);
            self.position += n as u64;
            bytes = &bytes[n..];

            if offset + n == WINDOW_SIZE {
                self.flush_window(WINDOW_SIZE)?;
            }
        }
        Ok(())
    }

    // Write a sequence of `len` bytes written `dist` bytes ago. Source and
    // destination may overlap, so bytes are copied one by one.
    pub fn write_previous(&mut self, dist: usize, len: usize) -> Result<()> {
        if dist == 0 || dist > WINDOW_SIZE || dist as u64 > self.position {
            return Err(Error::BadDistance);
        }

        for _ in 0..len {
            let from = ((self.position - dist as u64) & WINDOW_MASK) as usize;
            self.write_u8(self.data[from])?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn byte_count(&self) -> u64 {
        self.position
    }

    /// Writes out the last partial window. Returns the total byte count and the CRC-32 of the output.
    pub fn finish(mut self) -> Result<(u64, u32)> {
        let pending = self.offset();
        if pending != 0 {
            self.flush_window(pending)?;
        }
        self.inner.flush()?;
        Ok((self.position, self.crc.value()))
    }
}

////////////////////////////////////////////////////////////////////////////////
