//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface. Handles close when dropped, so a
//! handle is released exactly once on every path out of the scope that
//! opened it.

use crate::error::{Error, Result};
use std::ffi::CString;
use tracing::trace;

/// An open HID connection.
pub trait HidHandle {
    /// Write a raw output report, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Product descriptor string.
    fn product_string(&self) -> Result<Option<String>>;

    /// Serial number descriptor string.
    fn serial_number(&self) -> Result<Option<String>>;
}

/// Opens HID devices by vendor/product ID.
pub trait HidOpener {
    type Handle: HidHandle;

    /// Open the first device matching `vid`/`pid`.
    fn open(&self, vid: u16, pid: u16) -> Result<Self::Handle>;

    /// Open one specific interface by its platform path.
    fn open_path(&self, path: &str) -> Result<Self::Handle>;
}

/// `hidapi`-backed opener used outside of tests.
pub struct HidApiOpener {
    api: hidapi::HidApi,
}

impl HidApiOpener {
    /// Initialize the HID library.
    pub fn new() -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Init(e.to_string()))?;
        Ok(Self { api })
    }
}

impl HidOpener for HidApiOpener {
    type Handle = HidApiHandle;

    fn open(&self, vid: u16, pid: u16) -> Result<HidApiHandle> {
        let device = self.api.open(vid, pid).map_err(|e| {
            Error::DeviceNotFound(format!("VID=0x{vid:04X} PID=0x{pid:04X}: {e}"))
        })?;
        Ok(HidApiHandle { device })
    }

    fn open_path(&self, path: &str) -> Result<HidApiHandle> {
        let c_path =
            CString::new(path).map_err(|e| Error::Hid(format!("bad path {path:?}: {e}")))?;
        let device = self
            .api
            .open_path(&c_path)
            .map_err(|e| Error::Hid(format!("open {path}: {e}")))?;
        Ok(HidApiHandle { device })
    }
}

/// Open `hidapi` device. Dropping it closes the underlying handle.
pub struct HidApiHandle {
    device: hidapi::HidDevice,
}

impl HidHandle for HidApiHandle {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        trace!(report_hex = format_args!("{:02X?}", data), "HID TX");
        self.device
            .write(data)
            .map_err(|e| Error::Hid(format!("write: {e}")))
    }

    fn product_string(&self) -> Result<Option<String>> {
        self.device
            .get_product_string()
            .map_err(|e| Error::Hid(format!("product string: {e}")))
    }

    fn serial_number(&self) -> Result<Option<String>> {
        self.device
            .get_serial_number_string()
            .map_err(|e| Error::Hid(format!("serial number: {e}")))
    }
}
