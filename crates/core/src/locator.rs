//! Finds and opens the K380.

use crate::device::{DeviceInfo, KeyboardModel};
use crate::error::Result;
use crate::transport::{HidHandle, HidOpener};
use tracing::{debug, info};

/// Opens the keyboard by its fixed vendor/product ID.
pub struct Locator<O> {
    opener: O,
    model: KeyboardModel,
}

impl<O: HidOpener> Locator<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            model: KeyboardModel::K380,
        }
    }

    /// Open the keyboard, or `None` if it is not connected.
    ///
    /// Descriptor strings are read for logging only; failing to read them
    /// does not discard the handle.
    pub fn locate(&self) -> Option<O::Handle> {
        let handle = match self.opener.open(self.model.vid(), self.model.pid()) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(model = self.model.name(), error = %e, "Keyboard not available");
                return None;
            }
        };

        match handle.product_string() {
            Ok(Some(product)) => info!(product = %product, "Found device"),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Could not read product string"),
        }
        match handle.serial_number() {
            Ok(Some(serial)) => info!(serial = %serial, "Serial number"),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Could not read serial number"),
        }

        Some(handle)
    }

    /// Open one enumerated interface by path and read its product string.
    ///
    /// Unlike [`Locator::locate`] the open error is returned, so callers can
    /// tell a permission problem from a missing keyboard.
    pub fn check_interface(&self, dev: &DeviceInfo) -> Result<Option<String>> {
        let handle = self.opener.open_path(&dev.path)?;
        let product = handle.product_string().unwrap_or_else(|e| {
            debug!(path = %dev.path, error = %e, "Could not read product string");
            None
        });
        Ok(product)
    }
}
