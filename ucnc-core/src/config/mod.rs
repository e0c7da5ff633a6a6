//! Configuration types
//!
//! Motion settings, their persisted binary form and the boot-time
//! `machine.toml` reader.

pub mod parse;
pub mod settings;
#[cfg(feature = "serde")]
pub mod storage;

pub use parse::{parse_settings, ParseError, ParseErrorKind};
pub use settings::*;
#[cfg(feature = "serde")]
pub use storage::{decode, encode, SETTINGS_MAGIC, SETTINGS_VERSION};

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Non-positive or non-finite scale, feed, acceleration or travel
    InvalidAxis,
    /// Delta geometry that cannot be solved
    InvalidGeometry,
    /// Junction deviation must be positive
    InvalidJunction,
    /// Timer frequencies or oversampling out of range
    InvalidTimer,
    /// Override limits out of range
    InvalidOverrides,
    /// `machine.toml` could not be read
    Parse(ParseError),
    /// Buffer too small or payload not encodable
    Serialize,
    /// Payload could not be decoded
    Deserialize,
    /// Blob does not start with the settings magic
    BadMagic,
    /// Blob written by a different format version
    VersionMismatch,
    /// Checksum does not match the contents
    CrcMismatch,
    /// Reload refused while motion is queued or the machine is not idle
    Busy,
}

impl From<ParseError> for ConfigError {
    fn from(e: ParseError) -> Self {
        ConfigError::Parse(e)
    }
}
