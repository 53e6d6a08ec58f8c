//! Device model: keyboard identity, function-key modes, and HID enumeration.

use crate::error::{Error, Result};
use crate::hidpp::{HidppRequest, DEVICE_INDEX_SELF, SHORT_REPORT_LEN};
use crate::{pids, LOGITECH_VID};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Feature index of the K380 function-key swap setting.
pub const K380_FN_SWAP_FEATURE_INDEX: u8 = 0x0B;
/// "Set" function of the function-key swap feature.
pub const K380_FN_SWAP_SET_FUNCTION: u8 = 0x01;
/// Software ID the K380 firmware expects on the swap request.
pub const K380_FN_SWAP_SW_ID: u8 = 0x0E;

/// Supported Logitech keyboard models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardModel {
    K380,
}

impl KeyboardModel {
    /// Look up model from a USB vendor/product ID pair.
    pub fn from_ids(vid: u16, pid: u16) -> Option<Self> {
        match (vid, pid) {
            (LOGITECH_VID, pids::K380) => Some(Self::K380),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::K380 => "Logitech K380",
        }
    }

    /// USB Vendor ID.
    pub fn vid(&self) -> u16 {
        LOGITECH_VID
    }

    /// USB Product ID.
    pub fn pid(&self) -> u16 {
        match self {
            Self::K380 => pids::K380,
        }
    }
}

/// Default behavior of the keyboard's top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FnKeysMode {
    /// Top row sends F1-F12 without holding Fn.
    On,
    /// Top row sends media/system keys without holding Fn.
    Off,
}

impl FnKeysMode {
    /// Parse the CLI words `on` / `off` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    /// Short upper-case label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Swap flag carried in the first parameter byte. The firmware treats
    /// 0 as "F-keys first".
    fn swap_flag(&self) -> u8 {
        match self {
            Self::On => 0x00,
            Self::Off => 0x01,
        }
    }

    /// HID++ request selecting this mode.
    pub fn request(&self) -> HidppRequest {
        HidppRequest::new(
            DEVICE_INDEX_SELF,
            K380_FN_SWAP_FEATURE_INDEX,
            K380_FN_SWAP_SET_FUNCTION,
            K380_FN_SWAP_SW_ID,
            vec![self.swap_flag(), 0x00, 0x00],
        )
    }

    /// Raw 7-byte report written to the keyboard.
    pub fn report(&self) -> Result<[u8; SHORT_REPORT_LEN]> {
        self.request().encode()
    }
}

/// Information about one enumerated HID interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: Option<KeyboardModel>,
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub release: u16,
    pub interface: i32,
    pub usage_page: u16,
    pub usage: u16,
}

impl DeviceInfo {
    /// Whether this interface belongs to a supported keyboard.
    pub fn is_supported(&self) -> bool {
        self.model.is_some()
    }
}

impl From<&hidapi::DeviceInfo> for DeviceInfo {
    fn from(info: &hidapi::DeviceInfo) -> Self {
        Self {
            model: KeyboardModel::from_ids(info.vendor_id(), info.product_id()),
            vid: info.vendor_id(),
            pid: info.product_id(),
            path: info.path().to_string_lossy().into_owned(),
            serial: info.serial_number().map(|s| s.to_string()),
            manufacturer: info.manufacturer_string().map(|s| s.to_string()),
            product: info.product_string().map(|s| s.to_string()),
            release: info.release_number(),
            interface: info.interface_number(),
            usage_page: info.usage_page(),
            usage: info.usage(),
        }
    }
}

/// Enumerate every HID interface visible to the host.
///
/// Supported keyboards are logged as they are found; the returned list
/// contains all interfaces so callers can print a full inventory.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::Init(e.to_string()))?;

    let devices: Vec<DeviceInfo> = api.device_list().map(DeviceInfo::from).collect();
    for dev in devices.iter().filter(|d| d.is_supported()) {
        info!(
            vid = format_args!("0x{:04X}", dev.vid),
            pid = format_args!("0x{:04X}", dev.pid),
            path = %dev.path,
            interface = dev.interface,
            "Found K380 interface"
        );
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}
