//! Computer keyboard play
//!
//! The home row plays white keys and the row above plays the black keys,
//! like a one-and-a-half octave piano: A = C, W = C#, S = D ... ' = F.
//! Z and X shift the mapping down or up by an octave.

use crate::input::NoteEvent;
use crate::note::NoteId;
use std::collections::HashMap;

/// Key label and semitone offset above the base note
const KEY_OFFSETS: [(&str, i32); 18] = [
    ("a", 0),   // C
    ("w", 1),   // C#
    ("s", 2),   // D
    ("e", 3),   // D#
    ("d", 4),   // E
    ("f", 5),   // F
    ("t", 6),   // F#
    ("g", 7),   // G
    ("y", 8),   // G#
    ("h", 9),   // A
    ("u", 10),  // A#
    ("j", 11),  // B
    ("k", 12),  // C
    ("o", 13),  // C#
    ("l", 14),  // D
    ("p", 15),  // D#
    (";", 16),  // E
    ("'", 17),  // F
];

const OCTAVE_DOWN: &str = "z";
const OCTAVE_UP: &str = "x";
const MAX_OCTAVE_SHIFT: i32 = 2;

pub struct KeyboardInput {
    base_note: NoteId,
    octave_offset: i32,
    velocity: u8,
    /// Key label -> note it started, so a release after an octave shift
    /// still stops the right note
    held: HashMap<String, NoteId>,
}

impl KeyboardInput {
    /// The mapping starts at the first C at or above `lowest`
    pub fn new(lowest: NoteId, velocity: u8) -> Self {
        let to_c = (12 - lowest.pitch_class() as i32) % 12;
        Self {
            base_note: lowest.transpose(to_c),
            octave_offset: 0,
            velocity,
            held: HashMap::new(),
        }
    }

    pub fn base_note(&self) -> NoteId {
        self.base_note
    }

    pub fn octave_offset(&self) -> i32 {
        self.octave_offset
    }

    /// Note a key would play with the current octave shift
    pub fn note_for(&self, key: &str) -> Option<NoteId> {
        let key = key.to_lowercase();
        KEY_OFFSETS
            .iter()
            .find(|(label, _)| *label == key)
            .map(|&(_, offset)| self.base_note.transpose(offset + self.octave_offset * 12))
    }

    /// Handle a key press. Returns `None` if the key is not ours, otherwise
    /// the events it caused (possibly none, e.g. for a repeat).
    pub fn key_down(&mut self, key: &str, repeat: bool) -> Option<Vec<NoteEvent>> {
        let key = key.to_lowercase();

        match key.as_str() {
            OCTAVE_DOWN => {
                if !repeat && self.octave_offset > -MAX_OCTAVE_SHIFT {
                    self.octave_offset -= 1;
                    log::debug!("Keyboard octave shift {}", self.octave_offset);
                }
                return Some(Vec::new());
            }
            OCTAVE_UP => {
                if !repeat && self.octave_offset < MAX_OCTAVE_SHIFT {
                    self.octave_offset += 1;
                    log::debug!("Keyboard octave shift {}", self.octave_offset);
                }
                return Some(Vec::new());
            }
            _ => {}
        }

        let note = self.note_for(&key)?;
        if repeat || self.held.contains_key(&key) {
            return Some(Vec::new());
        }

        self.held.insert(key, note);
        Some(vec![NoteEvent::On {
            note,
            velocity: self.velocity,
        }])
    }

    /// Handle a key release
    pub fn key_up(&mut self, key: &str) -> Option<NoteEvent> {
        self.held
            .remove(&key.to_lowercase())
            .map(|note| NoteEvent::Off { note })
    }

    /// Stop every held key (focus lost, teardown)
    pub fn release_all(&mut self) -> Vec<NoteEvent> {
        let mut notes: Vec<NoteId> = self.held.drain().map(|(_, note)| note).collect();
        notes.sort();
        notes.into_iter().map(|note| NoteEvent::Off { note }).collect()
    }

    pub fn held_notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.held.values().copied()
    }
}
