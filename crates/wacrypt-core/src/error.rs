use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported container variant: {0}")]
    UnsupportedVariant(String),

    #[error("integrity check failed: authentication tag mismatch")]
    IntegrityFailure,

    #[error("container truncated: need at least {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("unknown feature flag: {0}")]
    UnknownFeature(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
