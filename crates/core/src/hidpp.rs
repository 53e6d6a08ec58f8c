//! HID++ 2.0 short report encoding.
//!
//! The K380 function-key toggle is a plain short report (7 bytes, report ID
//! 0x10) addressed to the keyboard itself. No long reports are ever sent and
//! the keyboard's reply is not read back.

use crate::error::{Error, Result};

/// HID++ report ID for short messages (7 bytes total).
pub const SHORT_REPORT_ID: u8 = 0x10;

/// Short report length (including report ID).
pub const SHORT_REPORT_LEN: usize = 7;

/// Parameter bytes carried by a short report.
pub const SHORT_PARAMS_LEN: usize = SHORT_REPORT_LEN - 4;

/// Device index addressing a directly connected (non-receiver) device.
pub const DEVICE_INDEX_SELF: u8 = 0xFF;

/// A HID++ 2.0 short request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidppRequest {
    /// Device index (0xFF for a device connected without a receiver).
    pub device_index: u8,
    /// Feature index on the device.
    pub feature_index: u8,
    /// Function ID (bits 7:4) and software ID (bits 3:0).
    pub function_sw: u8,
    /// Parameter bytes, at most 3.
    pub params: Vec<u8>,
}

impl HidppRequest {
    /// Create a request for a feature index, function and software ID.
    pub fn new(
        device_index: u8,
        feature_index: u8,
        function: u8,
        sw_id: u8,
        params: Vec<u8>,
    ) -> Self {
        Self {
            device_index,
            feature_index,
            function_sw: (function << 4) | (sw_id & 0x0F),
            params,
        }
    }

    /// Encode into a zero-padded short report.
    pub fn encode(&self) -> Result<[u8; SHORT_REPORT_LEN]> {
        if self.params.len() > SHORT_PARAMS_LEN {
            return Err(Error::Protocol(format!(
                "{} parameter bytes do not fit a short report (max {})",
                self.params.len(),
                SHORT_PARAMS_LEN
            )));
        }

        let mut buf = [0u8; SHORT_REPORT_LEN];
        buf[0] = SHORT_REPORT_ID;
        buf[1] = self.device_index;
        buf[2] = self.feature_index;
        buf[3] = self.function_sw;
        buf[4..4 + self.params.len()].copy_from_slice(&self.params);
        Ok(buf)
    }
}
