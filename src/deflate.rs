#![forbid(unsafe_code)]

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::crc32::Crc32;
use crate::error::{Error, Result};
use crate::huffman_coding::{
    decode_litlen_distance_trees, fixed_tables, DistanceToken, HuffmanTable, LitLenToken,
};
use crate::sliding_window::SlidingWindow;

////////////////////////////////////////////////////////////////////////////////

/// Largest stored block the writer emits; shorter blocks only appear at end of input.
pub const MAX_STORED_BLOCK: usize = 32 * (1 << 10);

#[derive(Debug)]
pub struct BlockHeader {
    pub is_final: bool,
    pub compression_type: CompressionType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionType {
    Uncompressed = 0,
    FixedTree = 1,
    DynamicTree = 2,
}

impl TryFrom<u32> for CompressionType {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(Self::Uncompressed),
            1 => Ok(Self::FixedTree),
            2 => Ok(Self::DynamicTree),
            _ => Err(Error::BadBlockType),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

pub struct DeflateReader<'a, T> {
    bit_reader: &'a mut BitReader<T>,
}

impl<'a, T: Read> DeflateReader<'a, T> {
    pub fn new(bit_reader: &'a mut BitReader<T>) -> Self {
        Self { bit_reader }
    }

    fn read_header(&mut self) -> Result<BlockHeader> {
        let is_final = self.bit_reader.read_bits(1)? != 0;
        let compression_type = CompressionType::try_from(self.bit_reader.read_bits(2)?)?;

        Ok(BlockHeader {
            is_final,
            compression_type,
        })
    }

    /// Decodes one block into `output`. Returns whether it was the final one.
    pub fn decode_block<W: Write>(&mut self, output: &mut SlidingWindow<W>) -> Result<bool> {
        let block_header = self.read_header()?;

        match block_header.compression_type {
            CompressionType::Uncompressed => {
                let len = self.bit_reader.read_u16::<LittleEndian>()?;
                let nlen = self.bit_reader.read_u16::<LittleEndian>()?;

                if nlen != !len {
                    return Err(Error::BadLength);
                }

                let mut left = usize::from(len);
                while left > 0 {
                    let chunk = self.bit_reader.read_aligned(left)?;
                    output.write_bytes(chunk)?;
                    left -= chunk.len();
                }
            }

            CompressionType::FixedTree => {
                let (litlen_code, dist_code) = fixed_tables();
                self.decode_symbols(litlen_code, dist_code, output)?;
            }

            CompressionType::DynamicTree => {
                let (litlen_code, dist_code) = decode_litlen_distance_trees(self.bit_reader)?;
                self.decode_symbols(&litlen_code, &dist_code, output)?;
            }
        };

        Ok(block_header.is_final)
    }

    fn decode_symbols<W: Write>(
        &mut self,
        litlen_code: &HuffmanTable,
        dist_code: &HuffmanTable,
        output: &mut SlidingWindow<W>,
    ) -> Result<()> {
        loop {
            match litlen_code.read_token::<LitLenToken, _>(self.bit_reader)? {
                LitLenToken::EndOfBlock => return Ok(()),
                LitLenToken::Literal(c) => output.write_u8(c)?,
                LitLenToken::Length { base, extra_bits } => {
                    let len = usize::from(base) + self.bit_reader.read_bits(extra_bits)? as usize;

                    let DistanceToken { base, extra_bits } =
                        dist_code.read_token::<DistanceToken, _>(self.bit_reader)?;
                    let dist = usize::from(base) + self.bit_reader.read_bits(extra_bits)? as usize;

                    output.write_previous(dist, len)?;
                }
            }
        }
    }

    /// Decodes blocks until the final one.
    pub fn decode_stream<W: Write>(&mut self, output: &mut SlidingWindow<W>) -> Result<()> {
        while !self.decode_block(output)? {}
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Stored-block-only encoder: every block holds raw input bytes.
pub struct DeflateWriter<'a, T> {
    bit_writer: &'a mut BitWriter<T>,
}

impl<'a, T: Write> DeflateWriter<'a, T> {
    pub fn new(bit_writer: &'a mut BitWriter<T>) -> Self {
        Self { bit_writer }
    }

    pub fn write_stored_block(&mut self, data: &[u8], is_final: bool) -> Result<()> {
        debug_assert!(data.len() <= usize::from(u16::MAX));

        self.bit_writer.write_bits(u32::from(is_final), 1)?;
        self.bit_writer
            .write_bits(CompressionType::Uncompressed as u32, 2)?;

        let len = data.len() as u16;
        self.bit_writer.write_u16::<LittleEndian>(len)?;
        self.bit_writer.write_u16::<LittleEndian>(!len)?;
        self.bit_writer.write_all(data)?;

        Ok(())
    }

    /// Encodes all of `input`. Returns the number of bytes read and their CRC-32.
    pub fn encode_stream<R: Read>(&mut self, mut input: R) -> Result<(u64, u32)> {
        let mut chunk = vec![0_u8; MAX_STORED_BLOCK];
        let mut crc = Crc32::new();
        let mut byte_count = 0_u64;

        loop {
            let n = read_up_to(&mut input, &mut chunk)?;
            crc.update(&chunk[..n]);
            byte_count += n as u64;

            let is_final = n < MAX_STORED_BLOCK;
            self.write_stored_block(&chunk[..n], is_final)?;

            if is_final {
                return Ok((byte_count, crc.value()));
            }
        }
    }
}

// Fills `buf` unless the input ends first.
fn read_up_to<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

////////////////////////////////////////////////////////////////////////////////
