//! Decrypted payload formats
//!
//! Single-file backups carry a zlib stream (`78 01`, lowest compression);
//! multi-file shards carry a ZIP archive. Anything else usually means the
//! wrong key was used.

use std::io::{self, Write};

use flate2::{write::ZlibEncoder, Compression, Decompress, FlushDecompress, Status};

use wacrypt_core::CodecResult;

const ZLIB_MAGIC: [u8; 2] = [0x78, 0x01];
const ZIP_MAGIC: [u8; 2] = *b"PK";

/// Output grows in steps of this many bytes while inflating
const INFLATE_STEP: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Zlib,
    Zip,
    Unknown,
}

/// Identify a decrypted payload by its first two bytes.
pub fn classify(plaintext: &[u8]) -> PayloadKind {
    match plaintext.get(..2) {
        Some(magic) if magic == ZLIB_MAGIC => PayloadKind::Zlib,
        Some(magic) if magic == ZIP_MAGIC => PayloadKind::Zip,
        _ => PayloadKind::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inflated {
    pub data: Vec<u8>,
    /// `false` when the input ended before the end of the zlib stream
    pub complete: bool,
}

/// Decompress a zlib stream. A truncated stream is not an error: everything
/// that could be recovered is returned with `complete = false`.
pub fn inflate(compressed: &[u8]) -> CodecResult<Inflated> {
    let mut stream = Decompress::new(true);
    let mut data = Vec::with_capacity(compressed.len().saturating_mul(2).max(INFLATE_STEP));

    loop {
        if data.capacity() - data.len() < INFLATE_STEP {
            data.reserve(INFLATE_STEP);
        }
        let in_before = stream.total_in();
        let out_before = stream.total_out();
        let input = &compressed[in_before as usize..];

        let status = stream
            .decompress_vec(input, &mut data, FlushDecompress::None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if status == Status::StreamEnd {
            return Ok(Inflated {
                data,
                complete: true,
            });
        }
        if stream.total_in() == in_before && stream.total_out() == out_before {
            return Ok(Inflated {
                data,
                complete: false,
            });
        }
    }
}

/// Compress with zlib at level 1, the level backups are written with.
pub fn deflate(plaintext: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(plaintext.len() / 2), Compression::new(1));
    encoder.write_all(plaintext)?;
    Ok(encoder.finish()?)
}
