#![forbid(unsafe_code)]

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::crc32::Crc32;
use crate::deflate::{DeflateReader, DeflateWriter};
use crate::error::{Error, Result};
use crate::sliding_window::SlidingWindow;

////////////////////////////////////////////////////////////////////////////////

const ID1: u8 = 0x1f;
const ID2: u8 = 0x8b;

const CM_DEFLATE: u8 = 8;

const FTEXT_OFFSET: u8 = 0;
const FHCRC_OFFSET: u8 = 1;
const FEXTRA_OFFSET: u8 = 2;
const FNAME_OFFSET: u8 = 3;
const FCOMMENT_OFFSET: u8 = 4;
const RESERVED_FLAGS: u8 = 0b1110_0000;

const XFL_MAX_COMPRESSION: u8 = 2;
const OS_UNKNOWN: u8 = 0xff;

/// Header of every member we write: no flags, zero mtime.
pub const HEADER: [u8; 10] = [
    ID1,
    ID2,
    CM_DEFLATE,
    0,
    0,
    0,
    0,
    0,
    XFL_MAX_COMPRESSION,
    OS_UNKNOWN,
];

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemberHeader {
    pub modification_time: u32,
    pub extra: Option<Vec<u8>>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub extra_flags: u8,
    pub os: u8,
    pub header_crc: Option<u16>,
    pub is_text: bool,
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug)]
pub struct MemberFlags(pub u8);

impl MemberFlags {
    fn bit(&self, n: u8) -> bool {
        (self.0 >> n) & 1 != 0
    }

    pub fn is_text(&self) -> bool {
        self.bit(FTEXT_OFFSET)
    }

    pub fn has_crc(&self) -> bool {
        self.bit(FHCRC_OFFSET)
    }

    pub fn has_extra(&self) -> bool {
        self.bit(FEXTRA_OFFSET)
    }

    pub fn has_name(&self) -> bool {
        self.bit(FNAME_OFFSET)
    }

    pub fn has_comment(&self) -> bool {
        self.bit(FCOMMENT_OFFSET)
    }

    pub fn has_reserved(&self) -> bool {
        self.0 & RESERVED_FLAGS != 0
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub struct MemberFooter {
    pub data_crc32: u32,
    pub data_size: u32,
}

////////////////////////////////////////////////////////////////////////////////

pub struct GzipReader<T> {
    reader: BitReader<T>,
}

impl<T: Read> GzipReader<T> {
    pub fn new(stream: T) -> Self {
        Self {
            reader: BitReader::new(stream),
        }
    }

    fn read_header(&mut self) -> Result<MemberHeader> {
        let mut reader = HeaderReader {
            reader: &mut self.reader,
            crc: Crc32::new(),
        };

        let mut id = [0_u8; 3];
        reader.read_exact(&mut id)?;
        if id != [ID1, ID2, CM_DEFLATE] {
            return Err(Error::BadHeader);
        }

        let flags = MemberFlags(reader.read_u8()?);
        if flags.has_reserved() {
            return Err(Error::BadHeader);
        }

        let mut header = MemberHeader {
            modification_time: reader.read_u32::<LittleEndian>()?,
            extra_flags: reader.read_u8()?,
            os: reader.read_u8()?,
            is_text: flags.is_text(),
            ..MemberHeader::default()
        };

        if flags.has_extra() {
            let xlen = reader.read_u16::<LittleEndian>()?;
            let mut extra = vec![0_u8; usize::from(xlen)];
            reader.read_exact(&mut extra)?;
            header.extra = Some(extra);
        }

        if flags.has_name() {
            header.name = Some(read_zero_terminated(&mut reader)?);
        }

        if flags.has_comment() {
            header.comment = Some(read_zero_terminated(&mut reader)?);
        }

        if flags.has_crc() {
            // Low 16 bits of the CRC-32 of every header byte before this field.
            let expected = reader.crc.value() as u16;
            let header_crc = reader.read_u16::<LittleEndian>()?;
            if header_crc != expected {
                return Err(Error::BadHeader);
            }
            header.header_crc = Some(header_crc);
        }

        Ok(header)
    }

    fn read_footer(&mut self) -> Result<MemberFooter> {
        let data_crc32 = self.reader.read_u32::<LittleEndian>()?;
        let data_size = self.reader.read_u32::<LittleEndian>()?;

        Ok(MemberFooter {
            data_crc32,
            data_size,
        })
    }

    /// Decodes one member into `output` and checks its trailer.
    ///
    /// Returns the member header and the number of bytes written.
    pub fn read_member<W: Write>(&mut self, output: W) -> Result<(MemberHeader, u64)> {
        let header = self.read_header()?;

        let mut window = SlidingWindow::new(output);
        DeflateReader::new(&mut self.reader).decode_stream(&mut window)?;
        let (written_byte_count, written_crc32) = window.finish()?;

        let footer = self.read_footer()?;

        // ISIZE holds the size modulo 2^32.
        if footer.data_size != written_byte_count as u32 || footer.data_crc32 != written_crc32 {
            return Err(Error::BadCrc);
        }

        Ok((header, written_byte_count))
    }

    /// Whether the input ends after the last member read.
    pub fn is_at_end(&mut self) -> Result<bool> {
        self.reader.is_at_end()
    }

    /// Whether the remaining input starts with a gzip magic number.
    /// Anything else after a member, padding included, is not read.
    pub fn has_next_member(&mut self) -> Result<bool> {
        Ok(self.reader.peek_aligned(2)? == [ID1, ID2])
    }
}

// Feeds every byte read into the CRC that the FHCRC field covers.
struct HeaderReader<'a, T> {
    reader: &'a mut BitReader<T>,
    crc: Crc32,
}

impl<T: Read> Read for HeaderReader<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.crc.update(&buf[..n]);
        Ok(n)
    }
}

// Header strings are ISO 8859-1, which maps byte for byte onto the first 256 chars.
fn read_zero_terminated<R: Read>(reader: &mut R) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_u8()? {
            0 => return Ok(text),
            c => text.push(char::from(c)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

pub struct GzipWriter<T> {
    writer: BitWriter<T>,
}

impl<T: Write> GzipWriter<T> {
    pub fn new(stream: T) -> Self {
        Self {
            writer: BitWriter::new(stream),
        }
    }

    /// Writes `input` as one complete member. Returns the number of bytes read.
    pub fn write_member<R: Read>(&mut self, input: R) -> Result<u64> {
        self.writer.write_all(&HEADER)?;

        let (byte_count, crc32) = DeflateWriter::new(&mut self.writer).encode_stream(input)?;

        self.writer.write_u32::<LittleEndian>(crc32)?;
        self.writer.write_u32::<LittleEndian>(byte_count as u32)?;

        Ok(byte_count)
    }

    pub fn finish(self) -> Result<T> {
        self.writer.finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
