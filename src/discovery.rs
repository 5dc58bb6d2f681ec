//! Enumeration of the devices registered in the dongle's slots.
//!
//! Discovery is a rendezvous between the requesting thread, which sends one
//! `GET SLOT:NN` at a time and blocks, and the read thread, which hands over
//! each `SLOT` reply and wakes it.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use arrayvec::ArrayVec;
use log::{debug, info, warn};
use snafu::ensure;

use crate::catalog::{Device, DeviceKind};
use crate::error::{DiscoveryAbortedSnafu, DiscoveryTimeoutSnafu, Result};
use crate::lock;
use crate::types::{DeviceId, SlotIndex, SLOT_COUNT};

/// An occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceSlot {
    slot: SlotIndex,
    device: Device,
}

impl DeviceSlot {
    pub fn new(slot: SlotIndex, id: DeviceId) -> Self {
        Self {
            slot,
            device: Device::new(id),
        }
    }

    pub const fn slot(&self) -> SlotIndex {
        self.slot
    }

    pub const fn device(&self) -> &Device {
        &self.device
    }

    pub const fn device_id(&self) -> DeviceId {
        self.device.id()
    }

    pub const fn model(&self) -> &'static str {
        self.device.model()
    }

    pub fn kind(&self) -> DeviceKind {
        self.device.kind()
    }
}

/// Result of a discovery run, ordered by slot.
pub type DeviceList = ArrayVec<DeviceSlot, SLOT_COUNT>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct SlotReply {
    value: Option<DeviceId>,
}

#[derive(Debug, Default)]
struct Rendezvous {
    /// Slot whose reply is awaited, None outside of discovery.
    pending: Option<SlotIndex>,
    closed: bool,
    /// Bumped by every `reopen`, so a stale reader cannot close a newer link.
    session: u64,
    reply: Option<SlotReply>,
}

#[derive(Debug, Default)]
pub struct SlotDiscovery {
    state: Mutex<Rendezvous>,
    replied: Condvar,
    // held for a whole run, so concurrent callers queue
    running: Mutex<()>,
}

impl SlotDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over a `SLOT` reply from the read thread and wake the requester.
    /// Replies arriving while no discovery runs, or naming another slot than
    /// the one requested, are dropped.
    pub fn record(&self, number: u8, value: Option<DeviceId>) {
        let mut state = lock(&self.state);
        let pending = state.pending;
        match pending {
            None => debug!("Ignoring SLOT:{:02} reply outside of discovery", number),
            Some(slot) if slot != usize::from(number) => {
                warn!("Ignoring SLOT:{:02} reply while waiting for slot {}", number, slot)
            }
            Some(_) => {
                state.reply = Some(SlotReply { value });
                self.replied.notify_all();
            }
        }
    }

    /// Wake a blocked requester with [`Error::DiscoveryAborted`](crate::Error::DiscoveryAborted).
    pub fn close(&self) {
        lock(&self.state).closed = true;
        self.replied.notify_all();
    }

    /// Like [`close`](Self::close), but only if no `reopen` happened since
    /// the one that returned `session`.
    pub fn close_session(&self, session: u64) {
        let mut state = lock(&self.state);
        if state.session == session {
            state.closed = true;
            self.replied.notify_all();
        }
    }

    /// Accept replies again after [`close`](Self::close). Returns the new session.
    pub fn reopen(&self) -> u64 {
        let mut state = lock(&self.state);
        state.session += 1;
        state.closed = false;
        state.reply = None;
        state.session
    }

    /// Query all slots in ascending order. `request` sends the query for one slot;
    /// the next slot is only requested after the reply for the previous one arrived.
    pub fn run<F>(&self, timeout: Duration, mut request: F) -> Result<DeviceList>
    where
        F: FnMut(SlotIndex) -> Result<()>,
    {
        let _running = lock(&self.running);

        let mut devices = DeviceList::new();
        let result = SlotIndex::all().try_for_each(|slot| {
            {
                let mut state = lock(&self.state);
                state.pending = Some(slot);
                state.reply = None;
            }
            request(slot)?;
            match self.wait_reply(slot, timeout)?.value {
                Some(id) => {
                    let entry = DeviceSlot::new(slot, id);
                    info!("Slot {}: {} ({})", slot, id, entry.model());
                    devices.push(entry);
                }
                None => debug!("Slot {} is empty", slot),
            }
            Ok(())
        });

        lock(&self.state).pending = None;
        result.map(|()| devices)
    }

    fn wait_reply(&self, slot: SlotIndex, timeout: Duration) -> Result<SlotReply> {
        let state = lock(&self.state);
        let (mut state, _) = self
            .replied
            .wait_timeout_while(state, timeout, |s| s.reply.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(reply) = state.reply.take() {
            return Ok(reply);
        }
        ensure!(!state.closed, DiscoveryAbortedSnafu { slot });
        DiscoveryTimeoutSnafu { slot, timeout }.fail()
    }
}
