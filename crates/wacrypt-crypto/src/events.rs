//! Diagnostics emitted by the codec
//!
//! The codec never logs on its own: every non-fatal observation goes to the
//! [`EventSink`] the caller passes in. Nothing the codec decides depends on
//! what the sink does with an event.

use std::sync::Mutex;

use crate::variant::Variant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecEvent {
    /// Header record decoded
    HeaderParsed {
        record_len: usize,
        has_feature_table: bool,
    },
    /// No 0x01 marker after the length byte
    FeatureTableAbsent,
    /// App version string is not four dot-separated numbers
    VersionUnrecognized { version: String },
    /// Phone-number suffix is not two characters long
    JidSuffixLength { suffix: String },
    /// Trailing 16 bytes equal the container checksum
    ChecksumMatched,
    /// Trailing 16 bytes are not a checksum: treating the input as a multi-file shard
    MultiFileDetected,
    /// GCM tag did not verify; the plaintext is returned unverified
    IntegrityFailure { variant: Variant },
}

pub trait EventSink {
    fn emit(&self, event: CodecEvent);
}

/// Forwards events to `tracing` at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CodecEvent) {
        match event {
            CodecEvent::HeaderParsed {
                record_len,
                has_feature_table,
            } => tracing::debug!(record_len, has_feature_table, "header record parsed"),
            CodecEvent::FeatureTableAbsent => {
                tracing::debug!("no feature table found (not a msgstore backup or very old)")
            }
            CodecEvent::VersionUnrecognized { version } => {
                tracing::warn!(%version, "app version not recognized")
            }
            CodecEvent::JidSuffixLength { suffix } => {
                tracing::warn!(%suffix, "phone number suffix is not 2 characters long")
            }
            CodecEvent::ChecksumMatched => tracing::debug!("container checksum OK"),
            CodecEvent::MultiFileDetected => {
                tracing::debug!("no container checksum, decoding as a multi-file shard")
            }
            CodecEvent::IntegrityFailure { variant } => tracing::error!(
                ?variant,
                "authentication tag mismatch: the backup is probably corrupted"
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CodecEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CodecEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CodecEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, event: &CodecEvent) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CodecEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
