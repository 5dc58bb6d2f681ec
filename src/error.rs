//! Errors returned by the [`Dongle`](crate::Dongle) client.

use std::io;
use std::time::Duration;

use snafu::Snafu;

use crate::types::SlotIndex;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// The serial port could not be opened or configured.
    #[snafu(display("Cannot open serial port {}: {}", port, source))]
    Connect {
        port: String,
        source: serialport::Error,
    },

    #[snafu(display("Dongle is already connected"))]
    AlreadyConnected,

    #[snafu(display("Dongle is not connected"))]
    NotConnected,

    #[snafu(display("Cannot start the read thread: {}", source))]
    SpawnReader { source: io::Error },

    /// Writing or flushing a command failed. Commands are not retried.
    #[snafu(display("Serial write failed: {}", source))]
    Io { source: io::Error },

    /// The dongle did not answer a `GET SLOT` request in time.
    #[snafu(display("No reply for slot {} within {:?}", slot, timeout))]
    DiscoveryTimeout { slot: SlotIndex, timeout: Duration },

    /// The link was closed while discovery was waiting for a reply.
    #[snafu(display("Disconnected while discovering slot {}", slot))]
    DiscoveryAborted { slot: SlotIndex },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
