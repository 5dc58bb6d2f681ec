//! This module defines range-checked types for slot indices and the
//! transmit-side output channels, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid slot index.
    #[snafu(display("Invalid slot index"))]
    InvalidSlot,
    /// The string doesn't name a beep mode.
    #[snafu(display("Invalid beep mode"))]
    InvalidBeepMode,
    /// The string doesn't name an output channel.
    #[snafu(display("Invalid output channel"))]
    InvalidOutput,
}

const fn invalid_slot() -> InvalidSlotSnafu {
    InvalidSlotSnafu
}

/// Numeric identity of a peripheral on the alarm bus.
pub type DeviceId = u32;

/// Number of device registration slots on the bus.
pub const SLOT_COUNT: usize = 32;

/// `SlotIndex` is a range-checked \[0, 31\] integer, representing one of the
/// device registration positions on the bus.
///
/// ## Example
/// ```
/// use turris_dongle::SlotIndex;
/// let slot = SlotIndex::new(7).unwrap();
/// assert_eq!(slot.to_string(), "07");
/// assert!(SlotIndex::new(32).is_err());
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct SlotIndex(u8);

/// Create a new [`SlotIndex`], panics if it is out of range.
pub const fn slot(s: u8) -> SlotIndex {
    if (s as usize) < SLOT_COUNT {
        return SlotIndex(s);
    }
    panic!("Invalid slot index.")
}

impl SlotIndex {
    /// Create a new slot index, checking that it is in \[0, 31\].
    /// # Errors
    /// Returns [`Error::InvalidSlot`] if `slot` is out of range.
    pub fn new(slot: impl TryInto<u8>) -> Result<Self, Error> {
        let slot = slot.try_into().ok().with_context(invalid_slot)?;
        ensure!((slot as usize) < SLOT_COUNT, invalid_slot());
        Ok(Self(slot))
    }

    /// Returns the next higher slot, or None for the last slot.
    pub fn next(self) -> Option<Self> {
        if (self.0 as usize) < SLOT_COUNT - 1 {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }

    /// All slots in ascending order.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl Deref for SlotIndex {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<usize> for SlotIndex {
    fn eq(&self, other: &usize) -> bool {
        self.0 as usize == *other
    }
}

impl TryFrom<usize> for SlotIndex {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Slots are printed the way the dongle expects them in commands.
impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Siren cadence driven by the `BEEP` field of the transmit line.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BeepMode {
    #[default]
    None,
    Slow,
    Fast,
}

impl BeepMode {
    /// The on-wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            BeepMode::None => "NONE",
            BeepMode::Slow => "SLOW",
            BeepMode::Fast => "FAST",
        }
    }
}

impl fmt::Display for BeepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeepMode {
    type Err = Error;

    /// Case-insensitive, accepts the on-wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(BeepMode::None),
            "SLOW" => Ok(BeepMode::Slow),
            "FAST" => Ok(BeepMode::Fast),
            _ => InvalidBeepModeSnafu.fail(),
        }
    }
}

/// Base of the virtual device identifiers given to the output channels.
const OUTPUT_ID_BASE: DeviceId = 0x100_0000;

/// One of the four binary outputs the dongle drives on the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    Enroll,
    Pgx,
    Pgy,
    Alarm,
}

impl OutputChannel {
    pub const ALL: [OutputChannel; 4] = [
        OutputChannel::Enroll,
        OutputChannel::Pgx,
        OutputChannel::Pgy,
        OutputChannel::Alarm,
    ];

    /// Virtual device identifier, placed above the range of real peripherals.
    pub const fn id(self) -> DeviceId {
        OUTPUT_ID_BASE + self as DeviceId
    }

    /// Look up a channel by its virtual device identifier.
    pub fn from_id(id: DeviceId) -> Option<Self> {
        Self::ALL.into_iter().find(|ch| ch.id() == id)
    }

    /// Name used when the host has no configured name for the output.
    pub const fn default_name(self) -> &'static str {
        match self {
            OutputChannel::Enroll => "ENROLL",
            OutputChannel::Pgx => "PGX",
            OutputChannel::Pgy => "PGY",
            OutputChannel::Alarm => "SIREN_LOUD",
        }
    }
}

impl FromStr for OutputChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enroll" => Ok(OutputChannel::Enroll),
            "pgx" => Ok(OutputChannel::Pgx),
            "pgy" => Ok(OutputChannel::Pgy),
            "alarm" | "siren_loud" => Ok(OutputChannel::Alarm),
            _ => InvalidOutputSnafu.fail(),
        }
    }
}
