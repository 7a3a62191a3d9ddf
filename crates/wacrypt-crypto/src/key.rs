//! Root key handling and the two-stage HMAC-SHA256 derivation of the AES key

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use wacrypt_core::{CodecError, CodecResult};

use crate::KEY_SIZE;

type HmacSha256 = Hmac<Sha256>;

/// Label for local backup encryption, followed by the iteration counter (always 1).
const BACKUP_ENCRYPTION_LABEL: &[u8] = b"backup encryption\x01";

/// The 32-byte secret stored in `encrypted_backup.key`.
///
/// Never used directly as a cipher key; see [`RootKey::derive`].
/// Zeroized on drop.
#[derive(Clone)]
pub struct RootKey {
    bytes: [u8; KEY_SIZE],
}

impl RootKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a root key from raw bytes, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CodecError::InvalidKeyLength {
                    what: "root key",
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Parse a 64-character hex string (surrounding whitespace is ignored).
    pub fn from_hex(text: &str) -> CodecResult<Self> {
        let mut decoded = hex::decode(text.trim())
            .map_err(|e| CodecError::MalformedKey(format!("not a hex string: {e}")))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Generate a fresh root key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Derive the AES-256 key used for the container payload.
    pub fn derive(&self) -> CodecResult<DerivedKey> {
        derive_key(&self.bytes)
    }
}

impl Drop for RootKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// AES-256 key derived from a [`RootKey`]. Recomputed per operation, zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AES-256 key from raw root key material.
///
/// 1. `intermediate = HMAC-SHA256(key = [0; 32], msg = root)`
/// 2. `derived = HMAC-SHA256(key = intermediate, msg = "backup encryption" || 0x01)`
pub fn derive_key(root: &[u8]) -> CodecResult<DerivedKey> {
    if root.len() != KEY_SIZE {
        return Err(CodecError::InvalidKeyLength {
            what: "root key",
            expected: KEY_SIZE,
            actual: root.len(),
        });
    }

    let mut intermediate = hmac_sha256(&[0u8; KEY_SIZE], root);
    let bytes = hmac_sha256(&intermediate, BACKUP_ENCRYPTION_LABEL);
    intermediate.zeroize();

    Ok(DerivedKey { bytes })
}

fn hmac_sha256(key: &[u8; KEY_SIZE], msg: &[u8]) -> [u8; KEY_SIZE] {
    // HMAC pads or hashes the key to the block size, so every key length is valid
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}
