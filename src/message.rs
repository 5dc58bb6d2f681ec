//! Typed events decoded from the dongle's line protocol.

use core::fmt;

use crate::types::DeviceId;

/// Kind of a decoded line.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Unrecognized or malformed line.
    #[default]
    Undef,
    Arm,
    Disarm,
    Beacon,
    Sensor,
    Tamper,
    Button,
    /// Thermostat set-point report.
    Set,
    /// Thermostat internal temperature report.
    Int,
    Ok,
    Err,
    /// Reply to a `GET SLOT` request.
    Slot,
    Version,
}

impl MessageType {
    /// Protocol name of the message type.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageType::Undef => "UNDEF",
            MessageType::Arm => "ARM",
            MessageType::Disarm => "DISARM",
            MessageType::Beacon => "BEACON",
            MessageType::Sensor => "SENSOR",
            MessageType::Tamper => "TAMPER",
            MessageType::Button => "BUTTON",
            MessageType::Set => "SET",
            MessageType::Int => "INT",
            MessageType::Ok => "OK",
            MessageType::Err => "ERR",
            MessageType::Slot => "SLOT",
            MessageType::Version => "VERSION",
        }
    }

    /// Temperature reports, which the firmware re-announces periodically.
    pub const fn is_telemetry(self) -> bool {
        matches!(self, MessageType::Set | MessageType::Int)
    }

    /// True for events originating from a bus peripheral.
    pub const fn is_device_event(self) -> bool {
        !matches!(
            self,
            MessageType::Undef
                | MessageType::Ok
                | MessageType::Err
                | MessageType::Slot
                | MessageType::Version
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded line from the dongle.
///
/// Messages are produced by [`MessageDecoder`](crate::MessageDecoder) and
/// never change afterwards. An [`Undef`](MessageType::Undef) message only
/// carries its text; `Slot`, `Version`, `Ok` and `Err` never carry a device.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub(crate) kind: MessageType,
    pub(crate) device_id: Option<DeviceId>,
    pub(crate) message_id: Option<u32>,
    pub(crate) device_model: Option<String>,
    pub(crate) activation: Option<i32>,
    pub(crate) low_battery: Option<i32>,
    pub(crate) temperature: Option<f32>,
    pub(crate) slot_number: Option<u8>,
    pub(crate) slot_value: Option<DeviceId>,
    pub(crate) version: Option<String>,
    pub(crate) text: String,
}

impl Message {
    pub(crate) fn new(kind: MessageType, text: &str) -> Self {
        Self {
            kind,
            text: text.to_owned(),
            ..Self::default()
        }
    }

    pub(crate) fn undefined(text: &str) -> Self {
        Self::new(MessageType::Undef, text)
    }

    pub const fn kind(&self) -> MessageType {
        self.kind
    }

    /// Identifier of the peripheral that sent the event.
    pub const fn device_id(&self) -> Option<DeviceId> {
        self.device_id
    }

    /// Sequence id, only sent by legacy firmware.
    pub const fn message_id(&self) -> Option<u32> {
        self.message_id
    }

    /// Model name as reported by the dongle.
    pub fn device_model(&self) -> Option<&str> {
        self.device_model.as_deref()
    }

    /// Value of the `ACT:` token. `BLACKOUT:` is reported here as well.
    pub const fn activation(&self) -> Option<i32> {
        self.activation
    }

    pub fn is_active(&self) -> Option<bool> {
        self.activation.map(|act| act != 0)
    }

    /// Value of the `LB:` token.
    pub const fn low_battery(&self) -> Option<i32> {
        self.low_battery
    }

    pub fn battery_low(&self) -> Option<bool> {
        self.low_battery.map(|lb| lb != 0)
    }

    /// Temperature of a `SET` or `INT` report, in degrees Celsius.
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub const fn slot_number(&self) -> Option<u8> {
        self.slot_number
    }

    /// Device registered in the slot, None for an empty slot.
    pub const fn slot_value(&self) -> Option<DeviceId> {
        self.slot_value
    }

    /// Firmware version from the dongle banner.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The received line without its terminator.
    pub fn text(&self) -> &str {
        &self.text
    }
}
