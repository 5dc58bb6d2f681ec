//! Decoding of inbound dongle lines into [`Message`]s.

use crate::message::{Message, MessageType};
use crate::nom_parser::{self, AttributeName, EventToken};

const VERSION_PREFIX: &str = "TURRIS DONGLE V";
const SLOT_PREFIX: &str = "SLOT:";

/// Token layout of device event lines, chosen by the dongle firmware.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FirmwareLayout {
    /// `(<id>) ID:<n>|ID:--- <model> <event> ...`
    Legacy,
    /// `(<id>) <model> <event> ...`
    #[default]
    Current,
}

/// Any failure while decoding, turned into an `Undef` message.
struct Malformed;

type Decoded = Result<Message, Malformed>;

trait OrMalformed<T> {
    fn or_malformed(self) -> Result<T, Malformed>;
}

impl<T> OrMalformed<T> for Option<T> {
    fn or_malformed(self) -> Result<T, Malformed> {
        self.ok_or(Malformed)
    }
}

/// Stateless decoder for the dongle's ASCII line protocol.
///
/// Decoding never fails: lines that don't follow the grammar come back as
/// [`MessageType::Undef`] holding only the text.
///
/// ```
/// use turris_dongle::{FirmwareLayout, MessageDecoder, MessageType};
///
/// let decoder = MessageDecoder::new(FirmwareLayout::Current);
/// let msg = decoder.decode("(1835009) JA-81M SENSOR LB:0 ACT:1\n");
/// assert_eq!(msg.kind(), MessageType::Sensor);
/// assert_eq!(msg.device_id(), Some(1835009));
/// assert_eq!(msg.is_active(), Some(true));
/// ```
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MessageDecoder {
    layout: FirmwareLayout,
}

impl MessageDecoder {
    pub const fn new(layout: FirmwareLayout) -> Self {
        Self { layout }
    }

    pub const fn layout(&self) -> FirmwareLayout {
        self.layout
    }

    /// Decode one line. Trailing whitespace, including the terminator, is ignored.
    pub fn decode(&self, line: &str) -> Message {
        let text = line.trim_end();
        self.decode_text(text)
            .unwrap_or_else(|Malformed| Message::undefined(text))
    }

    fn decode_text(&self, text: &str) -> Decoded {
        match text {
            "OK" => Ok(Message::new(MessageType::Ok, text)),
            "ERROR" => Ok(Message::new(MessageType::Err, text)),
            _ => {
                if let Some(version) = text.strip_prefix(VERSION_PREFIX) {
                    Ok(Message {
                        version: Some(version.to_owned()),
                        ..Message::new(MessageType::Version, text)
                    })
                } else if let Some(slot) = text.strip_prefix(SLOT_PREFIX) {
                    decode_slot(text, slot)
                } else {
                    self.decode_event(text)
                }
            }
        }
    }

    fn decode_event(&self, text: &str) -> Decoded {
        let mut tokens = text.split_whitespace();
        let mut next_token = || tokens.next().or_malformed();

        let device_id = nom_parser::parse_all(nom_parser::device_id, next_token()?).or_malformed()?;
        let (message_id, model) = match self.layout {
            FirmwareLayout::Legacy => {
                let message_id =
                    nom_parser::parse_all(nom_parser::message_id, next_token()?).or_malformed()?;
                (message_id, next_token()?)
            }
            FirmwareLayout::Current => (None, next_token()?),
        };
        let event = next_token()?;

        let (kind, temperature) = match nom_parser::parse_all(nom_parser::event_token, event) {
            Some(EventToken::Plain(kind)) => (kind, None),
            Some(EventToken::Temperature(kind, field)) => {
                let temperature = if field.is_empty() {
                    // "SET: 21.5": the value is the first three characters of the next token
                    let next = tokens.clone().next().or_malformed()?;
                    nom_parser::temperature(nom_parser::span(next, 0, 3))
                } else {
                    nom_parser::temperature(nom_parser::span(field, 0, 4))
                };
                (kind, Some(temperature.or_malformed()?))
            }
            None => return Err(Malformed),
        };

        let mut msg = Message {
            device_id: Some(device_id),
            message_id,
            device_model: Some(model.to_owned()),
            temperature,
            ..Message::new(kind, text)
        };

        for token in tokens {
            if let Ok((level, name)) = nom_parser::attribute_name(token) {
                let level = nom_parser::attribute_value(level).or_malformed()?;
                match name {
                    AttributeName::LowBattery => msg.low_battery = Some(level),
                    // BLACKOUT shares the activation field with ACT
                    AttributeName::Activation | AttributeName::Blackout => {
                        msg.activation = Some(level)
                    }
                }
            }
        }
        Ok(msg)
    }
}

/// `SLOT:NN [DDDDDDDD]`; anything but digits in the value field means an empty slot.
fn decode_slot(text: &str, slot: &str) -> Decoded {
    let number = nom_parser::decimal_u8(nom_parser::span(slot, 0, 2)).or_malformed()?;
    Ok(Message {
        slot_number: Some(number),
        slot_value: nom_parser::decimal_u32(nom_parser::span(slot, 4, 12)),
        ..Message::new(MessageType::Slot, text)
    })
}
