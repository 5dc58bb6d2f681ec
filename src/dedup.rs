//! Suppression of re-announced telemetry.
//!
//! The dongle repeats unchanged thermostat reports periodically. Messages with
//! a sequence id (legacy firmware) are accepted when the id changes; messages
//! without one are accepted unless they repeat the previous `SET`/`INT` type.

use crate::message::{Message, MessageType};

#[derive(Debug, Default, Clone)]
pub struct DedupFilter {
    last_message_id: Option<u32>,
    last_message_type: MessageType,
}

impl DedupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `msg` is delivered, remembering it if so.
    pub fn accept(&mut self, msg: &Message) -> bool {
        match msg.message_id() {
            None => {
                let kind = msg.kind();
                let accepted = kind != self.last_message_type || !kind.is_telemetry();
                if accepted {
                    self.last_message_type = kind;
                }
                accepted
            }
            Some(id) => {
                let accepted = self.last_message_id != Some(id);
                if accepted {
                    self.last_message_id = Some(id);
                }
                accepted
            }
        }
    }
}
