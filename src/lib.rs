#![forbid(unsafe_code)]

use std::io::{Read, Write};

pub mod bit_reader;
pub mod bit_writer;
pub mod crc32;
pub mod deflate;
pub mod error;
pub mod gzip;
pub mod huffman_coding;
pub mod sliding_window;

#[cfg(test)]
mod test_utils;

pub use crate::bit_reader::BitReader;
pub use crate::bit_writer::BitWriter;
pub use crate::crc32::{crc32, Crc32};
pub use crate::deflate::{DeflateReader, DeflateWriter};
pub use crate::error::{Error, Result};
pub use crate::gzip::{GzipReader, GzipWriter, MemberHeader};
pub use crate::huffman_coding::HuffmanTable;
pub use crate::sliding_window::SlidingWindow;

/// Compresses `input` into a single gzip member. Returns the number of bytes read.
pub fn compress_to_gzip<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    let mut gzip_writer = GzipWriter::new(output);
    let byte_count = gzip_writer.write_member(input)?;
    gzip_writer.finish()?;
    Ok(byte_count)
}

/// Decompresses every gzip member of `input`, verifying each trailer.
/// Bytes after a member that do not start a new one are ignored.
/// Returns the number of bytes written.
pub fn decompress_from_gzip<R: Read, W: Write>(input: R, mut output: W) -> Result<u64> {
    let mut gzip_reader = GzipReader::new(input);
    let mut byte_count = 0;

    loop {
        let (_, written) = gzip_reader.read_member(&mut output)?;
        byte_count += written;

        if !gzip_reader.has_next_member()? {
            break;
        }
    }

    Ok(byte_count)
}

/// Raw DEFLATE stream without a container.
pub fn deflate<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    let mut bit_writer = BitWriter::new(output);
    let (byte_count, _) = DeflateWriter::new(&mut bit_writer).encode_stream(input)?;
    bit_writer.finish()?;
    Ok(byte_count)
}

pub fn inflate<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    let mut bit_reader = BitReader::new(input);
    let mut window = SlidingWindow::new(output);
    DeflateReader::new(&mut bit_reader).decode_stream(&mut window)?;
    let (byte_count, _) = window.finish()?;
    Ok(byte_count)
}
