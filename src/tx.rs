//! Transmit-side state of the dongle and its on-wire encoding.

use crate::types::{BeepMode, OutputChannel};

/// Output channels and siren cadence last sent to the dongle.
///
/// The dongle has no incremental commands, every transmit carries the full state.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TxState {
    pub enroll: bool,
    pub pgx: bool,
    pub pgy: bool,
    pub alarm: bool,
    pub beep: BeepMode,
}

impl TxState {
    pub fn output(&self, channel: OutputChannel) -> bool {
        match channel {
            OutputChannel::Enroll => self.enroll,
            OutputChannel::Pgx => self.pgx,
            OutputChannel::Pgy => self.pgy,
            OutputChannel::Alarm => self.alarm,
        }
    }

    pub fn set_output(&mut self, channel: OutputChannel, on: bool) {
        let field = match channel {
            OutputChannel::Enroll => &mut self.enroll,
            OutputChannel::Pgx => &mut self.pgx,
            OutputChannel::Pgy => &mut self.pgy,
            OutputChannel::Alarm => &mut self.alarm,
        };
        *field = on;
    }

    /// The transmit command, including its framing newlines.
    pub fn encode(&self) -> String {
        encode(self)
    }
}

/// Format `state` as a `TX` command line.
///
/// ```
/// use turris_dongle::{encode, TxState};
/// let state = TxState { enroll: true, ..TxState::default() };
/// assert_eq!(encode(&state), "\nTX ENROLL:1 PGX:0 PGY:0 ALARM:0 BEEP:NONE\n");
/// ```
pub fn encode(state: &TxState) -> String {
    format!(
        "\nTX ENROLL:{} PGX:{} PGY:{} ALARM:{} BEEP:{}\n",
        u8::from(state.enroll),
        u8::from(state.pgx),
        u8::from(state.pgy),
        u8::from(state.alarm),
        state.beep,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let mut state = TxState {
            enroll: true,
            ..TxState::default()
        };
        assert_eq!(
            encode(&state),
            "\nTX ENROLL:1 PGX:0 PGY:0 ALARM:0 BEEP:NONE\n"
        );

        state.enroll = false;
        state.pgy = true;
        state.alarm = true;
        state.beep = BeepMode::Fast;
        assert_eq!(
            state.encode(),
            "\nTX ENROLL:0 PGX:0 PGY:1 ALARM:1 BEEP:FAST\n"
        );
    }

    #[test]
    fn test_outputs() {
        let mut state = TxState::default();
        for ch in OutputChannel::ALL {
            assert!(!state.output(ch));
            state.set_output(ch, true);
            assert!(state.output(ch));
        }
        assert_eq!(state.encode(), "\nTX ENROLL:1 PGX:1 PGY:1 ALARM:1 BEEP:NONE\n");

        state.set_output(OutputChannel::Pgx, false);
        assert!(!state.pgx);
        assert!(state.pgy);
    }
}
