//! Connection settings for the [`Dongle`](crate::Dongle) client.

use std::time::Duration;

use crate::decoder::FirmwareLayout;

/// Line speed of the Turris Dongle.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Settings fixed for the lifetime of a [`Dongle`](crate::Dongle).
///
/// Framing is always 8 data bits, no parity, one stop bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DongleConfig {
    pub baud_rate: u32,
    /// Token layout of event lines; legacy firmware adds a message id.
    pub firmware: FirmwareLayout,
    /// How long a single serial read may block. The read thread checks for
    /// shutdown at least this often.
    pub read_timeout: Duration,
    /// How long discovery waits for each `SLOT` reply.
    pub discovery_timeout: Duration,
}

impl Default for DongleConfig {
    fn default() -> Self {
        DongleConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            firmware: FirmwareLayout::Current,
            read_timeout: Duration::from_millis(100),
            discovery_timeout: Duration::from_secs(2),
        }
    }
}

impl DongleConfig {
    /// Default settings for a dongle running legacy firmware.
    pub fn legacy() -> Self {
        DongleConfig {
            firmware: FirmwareLayout::Legacy,
            ..Default::default()
        }
    }
}
