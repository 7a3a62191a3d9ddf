//! wacrypt-core: shared types for the crypt15 container codec
//!
//! - [`error`]: the codec error enum shared by every crate in the workspace
//! - [`config`]: TOML configuration (logging, encrypt-side header defaults)
//! - [`proto`]: header record messages generated from `backup.proto`

pub mod config;
pub mod error;
pub mod proto;

pub use error::{CodecError, CodecResult};
