//! Protocol engine for the Turris Dongle, a serial bridge to the Jablotron
//! wireless alarm bus.
//!
//! The dongle speaks an ASCII line protocol at 57600 baud. This crate decodes
//! its lines into typed [`Message`]s, suppresses re-announced telemetry,
//! enumerates the devices registered in the dongle's 32 slots, and sends the
//! state of the dongle's outputs (`ENROLL`, `PGX`, `PGY`, `ALARM` and the
//! siren cadence) back to the bus.
//!
//! The entry point is [`Dongle`]. The decoding pieces ([`MessageDecoder`],
//! [`DedupFilter`], [`catalog`]) are usable on their own.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod buffer;
pub mod bus;
pub mod catalog;
pub mod config;
mod decoder;
mod dedup;
pub mod discovery;
mod dongle;
mod error;
mod message;
mod nom_parser;
mod tx;
pub mod types;

pub use bus::{MessageBus, MessageFilter, Subscription};
pub use catalog::{model_for, Device, DeviceKind};
pub use config::DongleConfig;
pub use decoder::{FirmwareLayout, MessageDecoder};
pub use dedup::DedupFilter;
pub use discovery::{DeviceList, DeviceSlot};
pub use dongle::Dongle;
pub use error::{Error, Result};
pub use message::{Message, MessageType};
pub use tx::{encode, TxState};
pub use types::{slot, BeepMode, DeviceId, OutputChannel, SlotIndex, SLOT_COUNT};

/// Lock `mutex`, ignoring poisoning. Guarded state is never left half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
