#![forbid(unsafe_code)]

use std::io::Read;
use std::sync::OnceLock;

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

////////////////////////////////////////////////////////////////////////////////

// See RFC 1951, section 3.2.7.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Reads the code-length header of a dynamic block and builds its literal/length and distance tables.
pub fn decode_litlen_distance_trees<T: Read>(
    bit_reader: &mut BitReader<T>,
) -> Result<(HuffmanTable, HuffmanTable)> {
    let hlit = bit_reader.read_bits(5)? as usize + 257;
    let hdist = bit_reader.read_bits(5)? as usize + 1;
    let hclen = bit_reader.read_bits(4)? as usize + 4;

    let mut tct_code_lengths = [0_u8; 19];
    for &pos in CODE_LENGTH_ORDER.iter().take(hclen) {
        tct_code_lengths[pos] = bit_reader.read_bits(3)? as u8;
    }
    let tct_decoder = HuffmanTable::from_lengths(&tct_code_lengths)?;

    // Runs may cross from the literal/length lengths into the distance lengths.
    let total = hlit + hdist;
    let mut code_lengths = vec![0_u8; total];
    let mut i = 0_usize;

    while i < total {
        let (value, run) = match tct_decoder.read_token::<TreeCodeToken, _>(bit_reader)? {
            TreeCodeToken::Length(l) => (l, 1),
            TreeCodeToken::CopyPrev => {
                let prev_len = match i.checked_sub(1) {
                    Some(prev) => code_lengths[prev],
                    None => return Err(Error::BadTree),
                };
                (prev_len, 3 + bit_reader.read_bits(2)? as usize)
            }
            TreeCodeToken::RepeatZero { base, extra_bits } => {
                (0, base + bit_reader.read_bits(extra_bits)? as usize)
            }
        };

        if i + run > total {
            return Err(Error::BadTree);
        }
        code_lengths[i..i + run].fill(value);
        i += run;
    }

    let (litlen_code_lengths, dist_code_lengths) = code_lengths.split_at(hlit);
    let litlen_decoder = HuffmanTable::from_lengths(litlen_code_lengths)?;
    let dist_decoder = HuffmanTable::from_lengths(dist_code_lengths)?;

    Ok((litlen_decoder, dist_decoder))
}

/// The literal/length and distance tables of fixed-Huffman blocks, built on first use.
pub fn fixed_tables() -> &'static (HuffmanTable, HuffmanTable) {
    static FIXED: OnceLock<(HuffmanTable, HuffmanTable)> = OnceLock::new();

    FIXED.get_or_init(|| {
        let mut litlen_lengths = [0_u8; 288];
        litlen_lengths[..144].fill(8);
        litlen_lengths[144..256].fill(9);
        litlen_lengths[256..280].fill(7);
        litlen_lengths[280..].fill(8);

        (
            HuffmanTable::build(&litlen_lengths),
            HuffmanTable::build(&[5_u8; 30]),
        )
    })
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeCodeToken {
    Length(u8),
    CopyPrev,
    RepeatZero { base: usize, extra_bits: u8 },
}

impl TryFrom<u16> for TreeCodeToken {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self> {
        Ok(match v {
            0..=15 => Self::Length(v as u8),
            16 => Self::CopyPrev,
            17 => Self::RepeatZero {
                base: 3,
                extra_bits: 3,
            },
            18 => Self::RepeatZero {
                base: 11,
                extra_bits: 7,
            },
            _ => return Err(Error::BadSymbol),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

// See RFC 1951, section 3.2.5.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LitLenToken {
    Literal(u8),
    EndOfBlock,
    Length { base: u16, extra_bits: u8 },
}

impl TryFrom<u16> for LitLenToken {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self> {
        Ok(match v {
            0..=255 => Self::Literal(v as u8),
            256 => Self::EndOfBlock,
            257..=285 => {
                let code = usize::from(v - 257);
                Self::Length {
                    base: LENGTH_BASE[code],
                    extra_bits: LENGTH_EXTRA[code],
                }
            }
            _ => return Err(Error::BadSymbol),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistanceToken {
    pub base: u16,
    pub extra_bits: u8,
}

impl TryFrom<u16> for DistanceToken {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self> {
        let code = usize::from(v);
        if code >= DIST_BASE.len() {
            return Err(Error::BadSymbol);
        }

        Ok(Self {
            base: DIST_BASE[code],
            extra_bits: DIST_EXTRA[code],
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

pub const MAX_BITS: usize = 15;

/// Canonical prefix code built from per-symbol code lengths.
///
/// Codes are never materialized: `symbols` lists every used symbol ordered by
/// (code length, symbol value), which is exactly the order canonical codes are
/// handed out in, so the per-length counts are enough to walk it bit by bit.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    counts: [u16; MAX_BITS + 1],
    symbols: Vec<u16>,
}

impl HuffmanTable {
    /// Builds a table from `code_lengths[symbol]`, 0 meaning the symbol is unused.
    pub fn from_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.iter().any(|&len| usize::from(len) > MAX_BITS) {
            return Err(Error::BadTree);
        }
        Ok(Self::build(code_lengths))
    }

    fn build(code_lengths: &[u8]) -> Self {
        let mut counts = [0_u16; MAX_BITS + 1];
        for &len in code_lengths {
            counts[usize::from(len)] += 1;
        }
        counts[0] = 0;

        // offsets[len] is the first slot of the symbols with that length.
        let mut offsets = [0_usize; MAX_BITS + 1];
        for len in 1..=MAX_BITS {
            offsets[len] = offsets[len - 1] + usize::from(counts[len - 1]);
        }

        let mut symbols = vec![0_u16; offsets[MAX_BITS] + usize::from(counts[MAX_BITS])];
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len != 0 {
                let slot = &mut offsets[usize::from(len)];
                symbols[*slot] = symbol as u16;
                *slot += 1;
            }
        }

        Self { counts, symbols }
    }

    /// Number of symbols with a nonzero code length.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.symbols.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn read_symbol<U: Read>(&self, bit_reader: &mut BitReader<U>) -> Result<u16> {
        // `code` is the prefix read so far minus the first code of the current length.
        let mut code = 0_usize;
        let mut first_index = 0_usize;

        for len in 1..=MAX_BITS {
            code = (code << 1) | bit_reader.read_bit()? as usize;

            let count = usize::from(self.counts[len]);
            if code < count {
                return Ok(self.symbols[first_index + code]);
            }

            first_index += count;
            code -= count;
        }

        Err(Error::BadSymbol)
    }

    pub fn read_token<T, U>(&self, bit_reader: &mut BitReader<U>) -> Result<T>
    where
        T: TryFrom<u16, Error = Error>,
        U: Read,
    {
        T::try_from(self.read_symbol(bit_reader)?)
    }
}

////////////////////////////////////////////////////////////////////////////////
