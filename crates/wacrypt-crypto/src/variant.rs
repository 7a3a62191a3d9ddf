//! Single-file vs multi-file interpretation of the trailing 32 bytes

use wacrypt_core::{CodecError, CodecResult};

use crate::checksum::IncrementalHash;
use crate::{CHECKSUM_SIZE, TAG_SIZE, TRAILER_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `[ciphertext][tag][md5]`: a complete backup
    SingleFile,
    /// `[ciphertext ... ][last 16 ciphertext bytes][tag]`: one shard of a split backup
    MultiFile,
}

/// The two trailing 16-byte fields, whatever their role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub a: [u8; TAG_SIZE],
    pub b: [u8; CHECKSUM_SIZE],
}

/// Split `payload` (everything after the header) into body and trailer.
pub fn split_trailer(payload: &[u8]) -> CodecResult<(&[u8], Trailer)> {
    if payload.len() < TRAILER_SIZE {
        return Err(CodecError::Truncated {
            need: TRAILER_SIZE,
            have: payload.len(),
        });
    }
    let (body, rest) = payload.split_at(payload.len() - TRAILER_SIZE);
    let (a, b) = rest.split_at(TAG_SIZE);

    let trailer = Trailer {
        a: a.try_into().map_err(|_| CodecError::Truncated {
            need: TAG_SIZE,
            have: a.len(),
        })?,
        b: b.try_into().map_err(|_| CodecError::Truncated {
            need: CHECKSUM_SIZE,
            have: b.len(),
        })?,
    };
    Ok((body, trailer))
}

/// Single-file iff MD5(header || body || A) equals B.
pub fn disambiguate(header: &[u8], body: &[u8], trailer: &Trailer) -> Variant {
    if IncrementalHash::over(header, body, &trailer.a) == trailer.b {
        Variant::SingleFile
    } else {
        Variant::MultiFile
    }
}

impl Variant {
    /// The authentication tag for this reading of the trailer.
    pub fn tag<'t>(&self, trailer: &'t Trailer) -> &'t [u8; TAG_SIZE] {
        match self {
            Variant::SingleFile => &trailer.a,
            Variant::MultiFile => &trailer.b,
        }
    }

    /// Number of trailer bytes that belong to the ciphertext.
    pub fn ciphertext_tail(&self) -> usize {
        match self {
            Variant::SingleFile => 0,
            Variant::MultiFile => TAG_SIZE,
        }
    }
}
