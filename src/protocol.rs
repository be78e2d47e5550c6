//! Outbound text frames
//!
//! The server understands three kinds of frame: the device fingerprint sent
//! once after connecting, `on:<note> <velocity>` and `off:<note>`.

use crate::input::NoteEvent;
use crate::note::NoteId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Opaque device identifier, always the first frame of a connection
    Fingerprint(String),
    NoteOn { note: NoteId, velocity: u8 },
    NoteOff { note: NoteId },
}

impl From<NoteEvent> for ClientMessage {
    fn from(event: NoteEvent) -> Self {
        match event {
            NoteEvent::On { note, velocity } => ClientMessage::NoteOn { note, velocity },
            NoteEvent::Off { note } => ClientMessage::NoteOff { note },
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Fingerprint(fingerprint) => f.write_str(fingerprint),
            ClientMessage::NoteOn { note, velocity } => write!(f, "on:{} {}", note, velocity),
            ClientMessage::NoteOff { note } => write!(f, "off:{}", note),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_frames() {
        let on = ClientMessage::from(NoteEvent::On { note: NoteId(61), velocity: 127 });
        assert_eq!(on.to_string(), "on:61 127");

        let off = ClientMessage::from(NoteEvent::Off { note: NoteId(61) });
        assert_eq!(off.to_string(), "off:61");
    }

    #[test]
    fn test_negative_note_frame() {
        let off = ClientMessage::NoteOff { note: NoteId(-3) };
        assert_eq!(off.to_string(), "off:-3");
    }

    #[test]
    fn test_fingerprint_is_sent_verbatim() {
        let message = ClientMessage::Fingerprint("3f9a0c".to_string());
        assert_eq!(message.to_string(), "3f9a0c");
    }
}
