//! wacrypt-crypto: crypt15 backup container codec
//!
//! Container layout:
//! ```text
//! [1B len N][opt. 1B 0x01 feature marker][N-byte BackupPrefix record][ciphertext][16B A][16B B]
//! ```
//!
//! Key chain:
//! ```text
//! Root Key (32 bytes, key file or random)
//!   └── HMAC-SHA256(key = 0^32, root)                    → intermediate
//!       └── HMAC-SHA256(key = intermediate, "backup encryption" || 0x01) → AES-256 key
//! ```
//!
//! The trailing 32 bytes are read two ways:
//! - single file: `A` is the GCM tag, `B` is MD5 over everything before it
//! - multi-file shard: `A` is the last ciphertext block, `B` is the GCM tag

pub mod aead;
pub mod checksum;
pub mod container;
pub mod events;
pub mod header;
pub mod key;
pub mod lookahead;
pub mod payload;
pub mod variant;

pub use container::{decrypt_container, encrypt_container, DecryptedContainer, EncryptOptions};
pub use events::{CodecEvent, EventSink, NullSink, RecordingSink, TracingSink};
pub use header::{ContainerHeader, FeatureTable, HeaderTemplate};
pub use key::{derive_key, DerivedKey, RootKey};
pub use variant::Variant;

/// Size of a root key and of the derived AES-256 key
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM IV carried in the header
pub const IV_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the MD5 container checksum
pub const CHECKSUM_SIZE: usize = 16;

/// The two trailing 16-byte fields
pub const TRAILER_SIZE: usize = TAG_SIZE + CHECKSUM_SIZE;

/// Marker byte announcing the feature table
pub const FEATURE_MARKER: u8 = 0x01;
