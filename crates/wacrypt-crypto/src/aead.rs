//! AES-256-GCM with the 16-byte IV carried in the container header
//!
//! A 16-byte GCM nonce is hashed into the initial counter block, so the
//! cipher is instantiated with a `U16` nonce size instead of the usual 12.

use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm,
};

use wacrypt_core::{CodecError, CodecResult};

use crate::key::DerivedKey;
use crate::{IV_SIZE, TAG_SIZE};

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Result of opening a ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub plaintext: Vec<u8>,
    /// `false` when the tag did not match; `plaintext` is then unauthenticated
    pub verified: bool,
}

/// Encrypt `plaintext` in one pass. Returns the ciphertext and its detached tag.
pub fn seal(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    plaintext: &[u8],
) -> CodecResult<(Vec<u8>, [u8; TAG_SIZE])> {
    let cipher = Aes256Gcm16::new(key.as_bytes().into());
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), b"", &mut buffer)
        .map_err(|e| CodecError::Cipher(format!("AES-GCM encryption failed: {e}")))?;
    Ok((buffer, tag.into()))
}

/// Decrypt `ciphertext` and check `tag`.
///
/// A tag mismatch is not an error: the keystream is still applied and the
/// plaintext comes back with `verified = false`.
pub fn open(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> CodecResult<Opened> {
    let cipher = Aes256Gcm16::new(key.as_bytes().into());
    let nonce = GenericArray::from_slice(iv);
    let mut buffer = ciphertext.to_vec();

    if cipher
        .decrypt_in_place_detached(nonce, b"", &mut buffer, GenericArray::from_slice(tag))
        .is_ok()
    {
        return Ok(Opened {
            plaintext: buffer,
            verified: true,
        });
    }

    // GCM encryption is CTR mode plus a tag: running it over the ciphertext
    // yields the plaintext. The tag it produces is discarded.
    buffer.clear();
    buffer.extend_from_slice(ciphertext);
    cipher
        .encrypt_in_place_detached(nonce, b"", &mut buffer)
        .map_err(|e| CodecError::Cipher(format!("AES-GCM keystream failed: {e}")))?;

    Ok(Opened {
        plaintext: buffer,
        verified: false,
    })
}
