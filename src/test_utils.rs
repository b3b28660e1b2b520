#![forbid(unsafe_code)]

use std::io::Write;

use crate::bit_writer::BitWriter;
use crate::error::Result;

/// Huffman codes go on the wire most significant bit first.
pub fn write_code<W: Write>(writer: &mut BitWriter<W>, code: u32, len: u8) -> Result<()> {
    for i in (0..len).rev() {
        writer.write_bits((code >> i) & 1, 1)?;
    }
    Ok(())
}

/// Code and length of a literal/length symbol under the fixed Huffman table.
pub fn fixed_litlen_code(symbol: u16) -> (u32, u8) {
    let symbol = u32::from(symbol);
    match symbol {
        0..=143 => (0b00110000 + symbol, 8),
        144..=255 => (0b110010000 + symbol - 144, 9),
        256..=279 => (symbol - 256, 7),
        _ => (0b11000000 + symbol - 280, 8),
    }
}

pub fn write_fixed_symbol<W: Write>(writer: &mut BitWriter<W>, symbol: u16) -> Result<()> {
    let (code, len) = fixed_litlen_code(symbol);
    write_code(writer, code, len)
}

/// Deterministic, poorly compressible bytes.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x1234_5678_u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}
