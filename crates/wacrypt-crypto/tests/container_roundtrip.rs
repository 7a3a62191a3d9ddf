//! End-to-end container tests: encrypt, decrypt, tamper, and reject.

use prost::Message;
use proptest::prelude::*;

use wacrypt_core::proto::{BackupInfo, BackupPrefix, C14Cipher};
use wacrypt_core::CodecError;
use wacrypt_crypto::{
    decrypt_container, encrypt_container, CodecEvent, ContainerHeader, EncryptOptions,
    HeaderTemplate, NullSink, RecordingSink, RootKey, Variant,
};

fn options(iv: [u8; 16]) -> EncryptOptions {
    EncryptOptions::new(HeaderTemplate::new("2.22.5.13", "67")).with_iv(iv)
}

fn crypt14_container() -> Vec<u8> {
    let prefix = BackupPrefix {
        c14_cipher: Some(C14Cipher {
            iv: vec![0x5A; 16],
            ..Default::default()
        }),
        info: Some(BackupInfo {
            app_version: "2.21.8.17".into(),
            jid_suffix: "42".into(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let record = prefix.encode_to_vec();
    let mut data = vec![record.len() as u8, 0x01];
    data.extend_from_slice(&record);
    data
}

#[test]
fn crypt14_header_rejected_before_cipher_work() {
    let mut data = crypt14_container();
    data.extend_from_slice(&[0u8; 64]);
    let sink = RecordingSink::new();

    let err = decrypt_container(&RootKey::generate(), &data, &sink).unwrap_err();

    assert!(matches!(err, CodecError::UnsupportedVariant(_)), "got {err}");
    assert!(!sink.contains(&CodecEvent::ChecksumMatched));
    assert!(!sink.contains(&CodecEvent::MultiFileDetected));
}

#[test]
fn crypt14_header_rejected_even_without_payload() {
    // header only: no trailer to speak of, still reported as the wrong family
    let err = decrypt_container(&RootKey::generate(), &crypt14_container(), &NullSink)
        .unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedVariant(_)), "got {err}");
}

#[test]
fn reencrypt_with_reference_header() {
    let root = RootKey::generate();
    let mut features = wacrypt_crypto::FeatureTable::new();
    features.insert("f_15".into(), true);
    features.insert("f_33".into(), true);
    let reference = encrypt_container(
        &root,
        b"original",
        &EncryptOptions::new(HeaderTemplate::new("2.23.2.73", "19").with_features(features)),
    )
    .unwrap();

    let parsed = ContainerHeader::parse(&reference, &NullSink).unwrap();
    let copy = encrypt_container(
        &root,
        b"rewritten",
        &EncryptOptions::new(HeaderTemplate::from_parsed(&parsed)),
    )
    .unwrap();

    let decrypted = decrypt_container(&root, &copy, &NullSink).unwrap();
    assert!(decrypted.verified);
    assert_eq!(decrypted.plaintext, b"rewritten");
    assert_eq!(decrypted.header.app_version, "2.23.2.73");
    assert_eq!(decrypted.header.jid_suffix, "19");
    assert_eq!(decrypted.header.enabled_features(), vec!["f_15", "f_33"]);
    assert_ne!(decrypted.header.iv, parsed.iv);
}

proptest! {
    #[test]
    fn encrypt_then_decrypt_is_identity(
        plaintext in proptest::collection::vec(any::<u8>(), 0..=4096),
        root in any::<[u8; 32]>(),
        iv in any::<[u8; 16]>(),
    ) {
        let root = RootKey::from_bytes(root);
        let container = encrypt_container(&root, &plaintext, &options(iv)).unwrap();

        let decrypted = decrypt_container(&root, &container, &NullSink).unwrap();

        prop_assert!(decrypted.verified);
        prop_assert_eq!(decrypted.variant, Variant::SingleFile);
        prop_assert_eq!(decrypted.header.iv, iv);
        prop_assert_eq!(decrypted.plaintext, plaintext);
    }

    #[test]
    fn single_bit_flip_is_unverified_not_fatal(
        plaintext in proptest::collection::vec(any::<u8>(), 1..=512),
        offset in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let root = RootKey::from_bytes([0x24; 32]);
        let mut container = encrypt_container(&root, &plaintext, &options([7; 16])).unwrap();
        let header_len = ContainerHeader::parse(&container, &NullSink).unwrap().len();

        // anywhere in ciphertext, tag or checksum
        let at = header_len + offset.index(container.len() - header_len);
        container[at] ^= 1 << bit;

        let decrypted = decrypt_container(&root, &container, &NullSink).unwrap();

        prop_assert!(!decrypted.verified);
        // the checksum no longer matches, so A is read as ciphertext
        prop_assert_eq!(decrypted.variant, Variant::MultiFile);
        prop_assert_eq!(decrypted.plaintext.len(), plaintext.len() + 16);
    }
}
