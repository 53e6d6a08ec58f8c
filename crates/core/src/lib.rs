//! k380-fn-core: function-key mode configuration for the Logitech K380.
//!
//! The K380 accepts a single HID++ 2.0 short report that selects whether the
//! top row sends F1-F12 or media keys by default. This crate encodes that
//! report, locates the keyboard, applies the setting with bounded retry, and
//! runs a reconnect-tolerant monitor loop that re-applies it.

pub mod applier;
pub mod clock;
pub mod device;
pub mod error;
pub mod hidpp;
pub mod locator;
pub mod monitor;
pub mod transport;

/// Logitech USB Vendor ID.
pub const LOGITECH_VID: u16 = 0x046D;

/// Known Logitech keyboard product IDs.
pub mod pids {
    /// K380 Multi-Device Bluetooth keyboard.
    pub const K380: u16 = 0xB342;
}
