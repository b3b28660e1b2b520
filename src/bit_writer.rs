#![forbid(unsafe_code)]

use std::cmp::min;
use std::io::{self, Write};

use crate::bit_reader::BUFFER_SIZE;
use crate::error::Result;

////////////////////////////////////////////////////////////////////////////////

/// LSB-first bit writer, mirror of `BitReader`.
pub struct BitWriter<T> {
    stream: T,
    buf: Box<[u8]>,
    bit_pos: usize, // bits queued in `buf`; bytes past it are always zero
}

impl<T: Write> BitWriter<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buf: vec![0_u8; BUFFER_SIZE].into_boxed_slice(),
            bit_pos: 0,
        }
    }

    // Writes out every complete byte and keeps the partial one at the front.
    fn flush_whole_bytes(&mut self) -> io::Result<()> {
        let full = self.bit_pos >> 3;
        let partial_bits = self.bit_pos & 7;

        self.stream.write_all(&self.buf[..full])?;

        let last = if partial_bits != 0 { self.buf[full] } else { 0 };
        let dirty = min(full + 1, self.buf.len());
        self.buf[..dirty].fill(0);
        self.buf[0] = last;
        self.bit_pos = partial_bits;

        Ok(())
    }

    /// Appends the low `len` bits of `value` (at most 32), least significant first.
    pub fn write_bits(&mut self, value: u32, len: u8) -> Result<()> {
        debug_assert!(len <= 32);

        let mut value = value;
        let mut left = len as usize;

        while left > 0 {
            if self.bit_pos == self.buf.len() * 8 {
                self.flush_whole_bytes()?;
            }

            let low = self.bit_pos & 7;
            let take = min(8 - low, left);
            let bits = (value & ((1 << take) - 1)) as u8;

            self.buf[self.bit_pos >> 3] |= bits << low;
            self.bit_pos += take;
            value >>= take;
            left -= take;
        }

        Ok(())
    }

    /// Pads the current byte with zero bits.
    pub fn align_to_byte(&mut self) {
        self.bit_pos = (self.bit_pos + 7) & !7;
    }

    /// Pads the last partial byte, writes everything out and returns the stream.
    pub fn finish(mut self) -> Result<T> {
        self.align_to_byte();
        self.flush_whole_bytes()?;
        self.stream.flush()?;
        Ok(self.stream)
    }
}

// Byte-level writes start at the next byte boundary.
impl<T: Write> Write for BitWriter<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.align_to_byte();
        if self.bit_pos == self.buf.len() * 8 {
            self.flush_whole_bytes()?;
        }

        let start = self.bit_pos >> 3;
        let n = min(data.len(), self.buf.len() - start);
        self.buf[start..start + n].copy_from_slice(&data[..n]);
        self.bit_pos += n * 8;

        Ok(n)
    }

    // A trailing partial byte stays queued until `finish`.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_whole_bytes()?;
        self.stream.flush()
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_reader::BitReader;
    use byteorder::{LittleEndian, WriteBytesExt};

    #[test]
    fn write_bits() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b1, 1)?;
        writer.write_bits(0b01, 2)?;
        writer.write_bits(0b100, 3)?;
        writer.write_bits(0b1101, 4)?;
        writer.write_bits(0b10110, 5)?;
        writer.write_bits(0b01011111, 8)?;
        assert_eq!(writer.finish()?, vec![0b01100011, 0b11011011, 0b00101111]);
        Ok(())
    }

    #[test]
    fn high_bits_are_ignored() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0xffff_fffe, 3)?;
        writer.write_bits(!0, 0)?;
        assert_eq!(writer.finish()?, vec![0b110]);
        Ok(())
    }

    #[test]
    fn byte_writes_start_at_boundary() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3)?;
        writer.write_u16::<LittleEndian>(0xbeef)?;
        writer.write_bits(0b1, 1)?;
        writer.write_all(&[7])?;
        assert_eq!(writer.finish()?, vec![0b101, 0xef, 0xbe, 0b1, 7]);
        Ok(())
    }

    #[test]
    fn partial_byte_survives_flush() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0xabc, 12)?;
        writer.flush()?;
        writer.write_bits(0xd, 4)?;
        assert_eq!(writer.finish()?, vec![0xbc, 0xda]);
        Ok(())
    }

    #[test]
    fn round_trip_across_buffer_boundary() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(Vec::new());
        for i in 0..BUFFER_SIZE as u32 {
            writer.write_bits(i % 7, 3)?;
            writer.write_bits(i, 13)?;
            writer.write_bits(i.wrapping_mul(2654435761), 32)?;
        }
        let bytes = writer.finish()?;
        assert_eq!(bytes.len(), BUFFER_SIZE * 6);

        let mut reader = BitReader::new(&bytes[..]);
        for i in 0..BUFFER_SIZE as u32 {
            assert_eq!(reader.read_bits(3)?, i % 7);
            assert_eq!(reader.read_bits(13)?, i & 0x1fff);
            assert_eq!(reader.read_bits(32)?, i.wrapping_mul(2654435761));
        }
        assert!(reader.is_at_end()?);
        Ok(())
    }
}
