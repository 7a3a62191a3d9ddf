//! Whole-container encrypt and decrypt over in-memory buffers

use rand::RngCore;

use wacrypt_core::{CodecError, CodecResult};

use crate::aead::{self, Opened};
use crate::checksum::IncrementalHash;
use crate::events::{CodecEvent, EventSink};
use crate::header::{ContainerHeader, HeaderTemplate};
use crate::key::{DerivedKey, RootKey};
use crate::variant::{self, Variant};
use crate::{IV_SIZE, TRAILER_SIZE};

/// Decrypted payload of a container.
#[derive(Debug, Clone)]
pub struct DecryptedContainer {
    pub header: ContainerHeader,
    pub plaintext: Vec<u8>,
    /// `false` when the GCM tag did not match
    pub verified: bool,
    pub variant: Variant,
}

impl DecryptedContainer {
    /// The plaintext, or `IntegrityFailure` if it was not authenticated.
    pub fn into_verified(self) -> CodecResult<Vec<u8>> {
        if self.verified {
            Ok(self.plaintext)
        } else {
            Err(CodecError::IntegrityFailure)
        }
    }
}

/// How to author a new container.
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// IV to use; a fresh random one when `None`
    pub iv: Option<[u8; IV_SIZE]>,
    pub header: HeaderTemplate,
}

impl EncryptOptions {
    pub fn new(header: HeaderTemplate) -> Self {
        Self { iv: None, header }
    }

    pub fn with_iv(mut self, iv: [u8; IV_SIZE]) -> Self {
        self.iv = Some(iv);
        self
    }
}

/// Decrypt the payload that follows `header`.
///
/// The trailer decides the cipher boundary: for a single-file container the
/// ciphertext is `body` and `A` is the tag, for a multi-file shard the
/// ciphertext is `body || A` and `B` is the tag.
pub fn decrypt_payload(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    header: &[u8],
    payload: &[u8],
    sink: &dyn EventSink,
) -> CodecResult<(Opened, Variant)> {
    let (body, trailer) = variant::split_trailer(payload)?;
    let variant = variant::disambiguate(header, body, &trailer);
    sink.emit(match variant {
        Variant::SingleFile => CodecEvent::ChecksumMatched,
        Variant::MultiFile => CodecEvent::MultiFileDetected,
    });

    let ciphertext = &payload[..body.len() + variant.ciphertext_tail()];
    let opened = aead::open(key, iv, ciphertext, variant.tag(&trailer))?;
    if !opened.verified {
        sink.emit(CodecEvent::IntegrityFailure { variant });
    }
    Ok((opened, variant))
}

/// Encrypt `plaintext` into a single-file payload: `header || ciphertext || tag || md5`.
pub fn encrypt_payload(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    header: &[u8],
    plaintext: &[u8],
) -> CodecResult<Vec<u8>> {
    let (ciphertext, tag) = aead::seal(key, iv, plaintext)?;
    let checksum = IncrementalHash::over(header, &ciphertext, &tag);

    let mut out = Vec::with_capacity(header.len() + ciphertext.len() + TRAILER_SIZE);
    out.extend_from_slice(header);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Decrypt a complete container.
///
/// The header is parsed before any key or cipher work, so containers of an
/// unsupported family are rejected up front.
pub fn decrypt_container(
    root: &RootKey,
    data: &[u8],
    sink: &dyn EventSink,
) -> CodecResult<DecryptedContainer> {
    let header = ContainerHeader::parse(data, sink)?;
    let need = header.len() + TRAILER_SIZE;
    if data.len() < need {
        return Err(CodecError::Truncated {
            need,
            have: data.len(),
        });
    }

    let key = root.derive()?;
    let (header_bytes, payload) = data.split_at(header.len());
    let (opened, variant) = decrypt_payload(&key, &header.iv, header_bytes, payload, sink)?;

    Ok(DecryptedContainer {
        header,
        plaintext: opened.plaintext,
        verified: opened.verified,
        variant,
    })
}

/// Author a single-file container around `plaintext`.
pub fn encrypt_container(
    root: &RootKey,
    plaintext: &[u8],
    options: &EncryptOptions,
) -> CodecResult<Vec<u8>> {
    let iv = options.iv.unwrap_or_else(random_iv);
    let header = options.header.serialize(&iv)?;
    let key = root.derive()?;
    encrypt_payload(&key, &iv, &header, plaintext)
}

fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullSink, RecordingSink};
    use crate::{CHECKSUM_SIZE, TAG_SIZE};

    fn options() -> EncryptOptions {
        EncryptOptions::new(HeaderTemplate::new("2.22.5.13", "00")).with_iv([0u8; IV_SIZE])
    }

    #[test]
    fn test_hello_world_zero_key_zero_iv() {
        let root = RootKey::from_bytes([0u8; 32]);
        let container = encrypt_container(&root, b"hello world", &options()).unwrap();

        let header = ContainerHeader::parse(&container, &NullSink).unwrap();
        assert_eq!(container.len(), header.len() + 11 + TAG_SIZE + CHECKSUM_SIZE);
        assert_eq!(header.iv, [0u8; IV_SIZE]);

        // fixed vector: AES-256-GCM, 16-byte zero nonce, derived key of the zero root
        let body = &container[header.len()..];
        assert_eq!(hex::encode(&body[..11]), "b4b3165569623835ad3ea5");
        assert_eq!(hex::encode(&body[11..11 + TAG_SIZE]), "71136fd5f0fc5941c2a37041c366756f");

        let (covered, checksum) = container.split_at(container.len() - CHECKSUM_SIZE);
        let mut hash = IncrementalHash::new();
        hash.update(covered);
        assert_eq!(hash.finalize().as_slice(), checksum);

        let sink = RecordingSink::new();
        let decrypted = decrypt_container(&root, &container, &sink).unwrap();
        assert!(decrypted.verified);
        assert_eq!(decrypted.variant, Variant::SingleFile);
        assert_eq!(decrypted.plaintext, b"hello world");
        assert!(sink.contains(&CodecEvent::ChecksumMatched));
    }

    #[test]
    fn test_random_iv_differs_per_call() {
        let root = RootKey::generate();
        let opts = EncryptOptions::new(HeaderTemplate::new("2.22.5.13", "00"));

        let a = encrypt_container(&root, b"same", &opts).unwrap();
        let b = encrypt_container(&root, b"same", &opts).unwrap();

        let iv_a = ContainerHeader::parse(&a, &NullSink).unwrap().iv;
        let iv_b = ContainerHeader::parse(&b, &NullSink).unwrap().iv;
        assert_ne!(iv_a, iv_b);
        assert_eq!(decrypt_container(&root, &b, &NullSink).unwrap().plaintext, b"same");
    }

    #[test]
    fn test_multi_file_shard() {
        // A shard is `header || ciphertext || tag` where the last 16
        // ciphertext bytes sit in the A slot and the tag in the B slot.
        let root = RootKey::from_bytes([5u8; 32]);
        let key = root.derive().unwrap();
        let iv = [3u8; IV_SIZE];
        let header = HeaderTemplate::new("2.22.5.13", "00").serialize(&iv).unwrap();
        let plaintext: Vec<u8> = (0..80u8).collect();

        let (ciphertext, tag) = aead::seal(&key, &iv, &plaintext).unwrap();
        let mut shard = header.clone();
        shard.extend_from_slice(&ciphertext);
        shard.extend_from_slice(&tag);

        let sink = RecordingSink::new();
        let decrypted = decrypt_container(&root, &shard, &sink).unwrap();

        assert_eq!(decrypted.variant, Variant::MultiFile);
        assert!(decrypted.verified);
        assert_eq!(decrypted.plaintext, plaintext);
        // body is everything between header and the 32-byte trailer
        let body_len = shard.len() - header.len() - TRAILER_SIZE;
        assert_eq!(decrypted.plaintext.len(), body_len + 16);
        assert!(sink.contains(&CodecEvent::MultiFileDetected));
    }

    #[test]
    fn test_tampered_tag_reports_integrity_failure() {
        let root = RootKey::from_bytes([1u8; 32]);
        let mut container = encrypt_container(&root, b"payload bytes", &options()).unwrap();
        let tag_at = container.len() - TRAILER_SIZE;
        container[tag_at] ^= 0x80;

        let sink = RecordingSink::new();
        let decrypted = decrypt_container(&root, &container, &sink).unwrap();

        assert!(!decrypted.verified);
        // checksum no longer matches, so the shard reading is taken
        assert_eq!(decrypted.variant, Variant::MultiFile);
        assert_eq!(decrypted.plaintext.len(), b"payload bytes".len() + 16);
        assert!(sink.contains(&CodecEvent::IntegrityFailure {
            variant: Variant::MultiFile
        }));
        assert!(matches!(
            decrypted.into_verified(),
            Err(CodecError::IntegrityFailure)
        ));
    }

    #[test]
    fn test_wrong_root_key_is_unverified() {
        let container =
            encrypt_container(&RootKey::from_bytes([1u8; 32]), b"payload", &options()).unwrap();

        let decrypted =
            decrypt_container(&RootKey::from_bytes([2u8; 32]), &container, &NullSink).unwrap();

        assert!(!decrypted.verified);
        assert_eq!(decrypted.variant, Variant::SingleFile);
        assert_ne!(decrypted.plaintext, b"payload");
    }

    #[test]
    fn test_container_without_trailer_is_truncated() {
        let header = HeaderTemplate::new("2.22.5.13", "00")
            .serialize(&[0u8; IV_SIZE])
            .unwrap();
        let mut data = header.clone();
        data.extend_from_slice(&[0u8; 20]);

        let err = decrypt_container(&RootKey::generate(), &data, &NullSink).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { have, .. } if have == data.len()));
    }

    #[test]
    fn test_decrypt_payload_directly() {
        let key = RootKey::from_bytes([8u8; 32]).derive().unwrap();
        let iv = [1u8; IV_SIZE];
        let header = b"\x00\x01";
        let container = encrypt_payload(&key, &iv, header, b"data").unwrap();

        let (opened, variant) =
            decrypt_payload(&key, &iv, header, &container[header.len()..], &NullSink).unwrap();

        assert_eq!(variant, Variant::SingleFile);
        assert!(opened.verified);
        assert_eq!(opened.plaintext, b"data");
    }
}
