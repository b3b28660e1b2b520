#![forbid(unsafe_code)]

use std::io;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a compress or decompress call.
///
/// All variants are terminal: the stream is not resynchronized after any of them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("not a gzip stream or unsupported header")]
    BadHeader,

    #[error("reserved deflate block type")]
    BadBlockType,

    #[error("stored block length does not match its complement")]
    BadLength,

    #[error("bad huffman symbol")]
    BadSymbol,

    #[error("malformed huffman code lengths")]
    BadTree,

    #[error("back-reference points before the start of output")]
    BadDistance,

    #[error("crc32 or size mismatch in trailer")]
    BadCrc,

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(err),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
