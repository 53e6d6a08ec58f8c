//! Error types for k380-fn-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The HID library could not be initialized.
    #[error("HID library initialization failed: {0}")]
    Init(String),

    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// Device not found or could not be opened.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device accepted fewer bytes than the report length.
    #[error("short write: {written} bytes written instead of {expected}")]
    ShortWrite { written: usize, expected: usize },

    /// Report could not be encoded.
    #[error("HID++ protocol error: {0}")]
    Protocol(String),

    /// Every apply attempt failed.
    #[error("failed to apply setting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
