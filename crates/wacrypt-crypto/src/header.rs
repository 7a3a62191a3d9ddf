//! Container header: `[len N][opt. 0x01][N-byte BackupPrefix record]`
//!
//! The length byte counts only the record. The 0x01 marker announces the
//! feature table and is absent in some older backups, so it is detected with a
//! one-byte lookahead. Newly authored headers always carry it.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::OnceLock;

use prost::Message;
use regex::Regex;

use wacrypt_core::config::EncryptConfig;
use wacrypt_core::proto::{BackupInfo, BackupPrefix, C15Iv, KeyType, FEATURE_NAMES};
use wacrypt_core::{CodecError, CodecResult};

use crate::events::{CodecEvent, EventSink};
use crate::lookahead::Lookahead;
use crate::{FEATURE_MARKER, IV_SIZE};

/// Feature flag name ("f_5" .. "f_39") → value
pub type FeatureTable = BTreeMap<String, bool>;

/// A parsed container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Declared length of the header record
    pub record_len: u8,
    /// Whether the 0x01 feature marker followed the length byte
    pub has_feature_table: bool,
    pub key_type: i32,
    pub app_version: String,
    pub jid_suffix: String,
    pub backup_version: i32,
    pub iv: [u8; IV_SIZE],
    /// Every flag of the record's feature table, `None` without the marker
    pub features: Option<FeatureTable>,
    raw: Vec<u8>,
}

impl ContainerHeader {
    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8], sink: &dyn EventSink) -> CodecResult<Self> {
        Self::read_from(&mut Lookahead::new(bytes), sink)
    }

    /// Read the header from a stream, leaving the reader on the first ciphertext byte.
    pub fn read_from<R: Read>(input: &mut Lookahead<R>, sink: &dyn EventSink) -> CodecResult<Self> {
        let record_len = input
            .next_byte()?
            .ok_or(CodecError::Truncated { need: 1, have: 0 })?;
        let mut raw = vec![record_len];

        let has_feature_table = input.next_if_eq(FEATURE_MARKER)?;
        if has_feature_table {
            raw.push(FEATURE_MARKER);
        } else {
            sink.emit(CodecEvent::FeatureTableAbsent);
        }

        let record = input.take_up_to(record_len as usize)?;
        if record.len() != record_len as usize {
            return Err(CodecError::MalformedHeader(format!(
                "header record declares {} bytes but only {} are present",
                record_len,
                record.len()
            )));
        }
        raw.extend_from_slice(&record);

        let prefix = BackupPrefix::decode(record.as_slice())
            .map_err(|e| CodecError::MalformedHeader(format!("cannot decode header record: {e}")))?;
        sink.emit(CodecEvent::HeaderParsed {
            record_len: record.len(),
            has_feature_table,
        });

        let info = prefix.info.clone().unwrap_or_default();
        if !is_app_version(&info.app_version) {
            sink.emit(CodecEvent::VersionUnrecognized {
                version: info.app_version.clone(),
            });
        }
        if info.jid_suffix.chars().count() != 2 {
            sink.emit(CodecEvent::JidSuffixLength {
                suffix: info.jid_suffix.clone(),
            });
        }

        let iv = extract_iv(&prefix)?;

        let features = has_feature_table.then(|| {
            FEATURE_NAMES
                .iter()
                .map(|name| (name.to_string(), info.feature(name).unwrap_or(false)))
                .collect()
        });

        Ok(Self {
            record_len,
            has_feature_table,
            key_type: prefix.key_type,
            app_version: info.app_version,
            jid_suffix: info.jid_suffix,
            backup_version: info.backup_version,
            iv,
            features,
            raw,
        })
    }

    /// The exact header bytes as they appear in the container.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Length of the header in the container (length byte, marker, record).
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Names of the feature flags that are set.
    pub fn enabled_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .flatten()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// crypt15 IV first; a crypt14 cipher block means a different container family.
fn extract_iv(prefix: &BackupPrefix) -> CodecResult<[u8; IV_SIZE]> {
    if let Some(c15) = prefix.c15_iv.as_ref().filter(|c| !c.iv.is_empty()) {
        return c15
            .iv
            .as_slice()
            .try_into()
            .map_err(|_| CodecError::InvalidKeyLength {
                what: "IV",
                expected: IV_SIZE,
                actual: c15.iv.len(),
            });
    }

    if prefix.c14_cipher.as_ref().is_some_and(|c| !c.iv.is_empty()) {
        return Err(CodecError::UnsupportedVariant(
            "header carries a crypt14 cipher block, not a crypt15 IV".into(),
        ));
    }

    Err(CodecError::MalformedHeader(
        "header record carries no IV".into(),
    ))
}

fn is_app_version(version: &str) -> bool {
    static APP_VERSION: OnceLock<Regex> = OnceLock::new();
    let re = APP_VERSION
        .get_or_init(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").expect("app version pattern is valid"));
    re.find_iter(version).count() == 1
}

/// Values written into the header of a newly authored container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    pub app_version: String,
    pub jid_suffix: String,
    pub backup_version: Option<i32>,
    pub features: FeatureTable,
}

impl HeaderTemplate {
    pub fn new(app_version: impl Into<String>, jid_suffix: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            jid_suffix: jid_suffix.into(),
            backup_version: None,
            features: FeatureTable::new(),
        }
    }

    pub fn with_features(mut self, features: FeatureTable) -> Self {
        self.features = features;
        self
    }

    pub fn from_config(config: &EncryptConfig) -> Self {
        Self {
            app_version: config.app_version.clone(),
            jid_suffix: config.jid_suffix.clone(),
            backup_version: config.backup_version,
            features: config.features.clone(),
        }
    }

    /// Mirror the header of an existing container (everything but its IV).
    pub fn from_parsed(header: &ContainerHeader) -> Self {
        Self {
            app_version: header.app_version.clone(),
            jid_suffix: header.jid_suffix.clone(),
            backup_version: (header.backup_version != 0).then_some(header.backup_version),
            features: header.features.clone().unwrap_or_default(),
        }
    }

    /// Serialize to `[len][0x01][record]` with `iv` as the crypt15 IV.
    pub fn serialize(&self, iv: &[u8; IV_SIZE]) -> CodecResult<Vec<u8>> {
        let mut info = BackupInfo {
            app_version: self.app_version.clone(),
            jid_suffix: self.jid_suffix.clone(),
            backup_version: self.backup_version.unwrap_or_default(),
            ..Default::default()
        };
        for (name, value) in &self.features {
            if !info.set_feature(name, *value) {
                return Err(CodecError::UnknownFeature(name.clone()));
            }
        }

        let prefix = BackupPrefix {
            key_type: KeyType::HsmControlled as i32,
            c14_cipher: None,
            c15_iv: Some(C15Iv { iv: iv.to_vec() }),
            info: Some(info),
        };
        let record = prefix.encode_to_vec();
        let record_len = u8::try_from(record.len()).map_err(|_| {
            CodecError::MalformedHeader(format!(
                "header record is {} bytes, the length prefix holds at most 255",
                record.len()
            ))
        })?;

        let mut out = Vec::with_capacity(2 + record.len());
        out.push(record_len);
        out.push(FEATURE_MARKER);
        out.extend_from_slice(&record);
        Ok(out)
    }
}
