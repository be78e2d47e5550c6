//! Note identifiers, white/black classification and display ranges
//!
//! Notes are plain semitone numbers. Only the pitch class (the value modulo
//! 12) decides whether a key is white or black, so negative notes and notes
//! far outside the MIDI range classify the same way as their octave twins.

use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A piano key in semitone units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i32);

impl NoteId {
    pub fn new(value: i32) -> Self {
        NoteId(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Position within the octave, always in 0..12 (C = 0)
    pub fn pitch_class(self) -> usize {
        self.0.rem_euclid(12) as usize
    }

    pub fn class(self) -> KeyClass {
        classify(self)
    }

    pub fn is_white(self) -> bool {
        self.class() == KeyClass::White
    }

    pub fn is_black(self) -> bool {
        self.class() == KeyClass::Black
    }

    /// Shift by a number of semitones, saturating at the i32 bounds
    pub fn transpose(self, semitones: i32) -> NoteId {
        NoteId(self.0.saturating_add(semitones))
    }
}

impl From<i32> for NoteId {
    fn from(value: i32) -> Self {
        NoteId(value)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a key sits in the lower (white) or raised (black) row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyClass {
    White,
    Black,
}

/// C, D, E, F, G, A and B are white; the five sharps are black
const KEY_CLASSES: [KeyClass; 12] = [
    KeyClass::White, // C
    KeyClass::Black, // C#
    KeyClass::White, // D
    KeyClass::Black, // D#
    KeyClass::White, // E
    KeyClass::White, // F
    KeyClass::Black, // F#
    KeyClass::White, // G
    KeyClass::Black, // G#
    KeyClass::White, // A
    KeyClass::Black, // A#
    KeyClass::White, // B
];

/// Classify a note as a white or black key
pub fn classify(note: NoteId) -> KeyClass {
    KEY_CLASSES[note.pitch_class()]
}

/// Widest range that can be laid out, the full MIDI note space
pub const MAX_DISPLAY_NOTES: usize = 128;

/// Inclusive window of notes laid out on the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayRange {
    lower: NoteId,
    upper: NoteId,
}

impl DisplayRange {
    /// Create a range covering `lower..=upper`.
    ///
    /// A range whose lower bound lies above its upper bound, or that spans
    /// more than `MAX_DISPLAY_NOTES` notes, is rejected.
    pub fn new(lower: impl Into<NoteId>, upper: impl Into<NoteId>) -> anyhow::Result<Self> {
        let lower = lower.into();
        let upper = upper.into();
        ensure!(
            lower <= upper,
            "invalid display range: lower note {lower} is above upper note {upper}"
        );
        let range = Self { lower, upper };
        ensure!(
            range.len() <= MAX_DISPLAY_NOTES,
            "invalid display range: [{lower}, {upper}] spans more than {MAX_DISPLAY_NOTES} notes"
        );
        Ok(range)
    }

    pub fn lower(&self) -> NoteId {
        self.lower
    }

    pub fn upper(&self) -> NoteId {
        self.upper
    }

    pub fn contains(&self, note: NoteId) -> bool {
        self.lower <= note && note <= self.upper
    }

    /// Number of notes in the range (never zero)
    pub fn len(&self) -> usize {
        usize::try_from(self.upper.0.abs_diff(self.lower.0))
            .map_or(usize::MAX, |span| span.saturating_add(1))
    }

    /// Iterate over every note from lower to upper
    pub fn notes(&self) -> impl Iterator<Item = NoteId> {
        (self.lower.0..=self.upper.0).map(NoteId)
    }

    pub fn white_count(&self) -> usize {
        self.notes().filter(|note| note.is_white()).count()
    }
}

impl fmt::Display for DisplayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
