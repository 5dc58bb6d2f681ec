//! Mapping of device identifiers to Jablotron model names.
//!
//! Each model owns a fixed block of identifiers; the blocks are disjoint.

use core::ops::RangeInclusive;

use crate::types::DeviceId;

/// Model name for identifiers outside every known block.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Model of the only thermostat on the bus.
pub const THERMOSTAT_MODEL: &str = "TP-82N";

const MODEL_RANGES: [(RangeInclusive<DeviceId>, &str); 10] = [
    (0x80_0000..=0x87_FFFF, "RC-86K"),
    (0x90_0000..=0x97_FFFF, "RC-86K"),
    (0x18_0000..=0x1B_FFFF, "JA-81M"),
    (0x1C_0000..=0x1D_FFFF, "JA-83M"),
    (0x64_0000..=0x65_FFFF, "JA-83P"),
    (0x7F_0000..=0x7F_FFFF, "JA-82SH"),
    (0x76_0000..=0x76_FFFF, "JA-85ST"),
    (0x58_0000..=0x59_FFFF, "JA-80L"),
    (0xCF_0000..=0xCF_FFFF, "AC-88"),
    (0x24_0000..=0x25_FFFF, THERMOSTAT_MODEL),
];

/// Look up the model name of a device.
///
/// ```
/// use turris_dongle::catalog::model_for;
/// assert_eq!(model_for(0x1B_FFFF), "JA-81M");
/// assert_eq!(model_for(0x88_0000), "Unknown");
/// ```
pub fn model_for(id: DeviceId) -> &'static str {
    MODEL_RANGES
        .iter()
        .find(|(range, _)| range.contains(&id))
        .map_or(UNKNOWN_MODEL, |(_, model)| *model)
}

/// How a host should represent a discovered device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Thermostat,
    Sensor,
}

/// A bus peripheral and its catalog model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    id: DeviceId,
    model: &'static str,
}

impl Device {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            model: model_for(id),
        }
    }

    pub const fn id(&self) -> DeviceId {
        self.id
    }

    pub const fn model(&self) -> &'static str {
        self.model
    }

    pub fn kind(&self) -> DeviceKind {
        if self.model == THERMOSTAT_MODEL {
            DeviceKind::Thermostat
        } else {
            DeviceKind::Sensor
        }
    }
}
