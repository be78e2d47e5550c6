//! Input router
//!
//! Resolves pointer positions to keys and turns pointer gestures into
//! note-on/note-off events. The router never leaves a note sounding once
//! the pointer is released or leaves the canvas.

use crate::layout::LayoutTable;
use crate::note::NoteId;

/// Find the key under a point.
///
/// Black keys are tested first because they are drawn on top of the white
/// keys they overlap.
pub fn hit_test(x: f64, y: f64, layout: &LayoutTable) -> Option<NoteId> {
    layout
        .black_keys()
        .chain(layout.white_keys())
        .find(|key| key.bounds.contains(x, y))
        .map(|key| key.note)
}

/// Pointer input in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move { x: f64, y: f64 },
    Down { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    /// Pointer left the canvas
    Leave,
}

/// Logical key events produced by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteEvent {
    On { note: NoteId, velocity: u8 },
    Off { note: NoteId },
}

impl NoteEvent {
    pub fn note(&self) -> NoteId {
        match *self {
            NoteEvent::On { note, .. } | NoteEvent::Off { note } => note,
        }
    }
}

/// Transient pointer state for the current interaction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    /// Last known pointer position, `None` once it leaves the canvas
    pub pointer: Option<(f64, f64)>,
    pub pointer_down: bool,
    /// Key under the pointer, for hover feedback
    pub hovered: Option<NoteId>,
    /// Key currently sounding because of the pointer
    pub held: Option<NoteId>,
}

pub struct InputRouter {
    state: InputState,
    velocity: u8,
    /// Slide from key to key while the pointer is held down
    glide: bool,
}

impl InputRouter {
    pub fn new(velocity: u8) -> Self {
        Self {
            state: InputState::default(),
            velocity,
            glide: false,
        }
    }

    pub fn with_glide(mut self, glide: bool) -> Self {
        self.glide = glide;
        self
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Apply a pointer event and return the note events it causes
    pub fn handle(&mut self, event: PointerEvent, layout: &LayoutTable) -> Vec<NoteEvent> {
        let mut events = Vec::new();

        match event {
            PointerEvent::Move { x, y } => {
                self.state.pointer = Some((x, y));
                self.state.hovered = hit_test(x, y, layout);

                if self.glide && self.state.pointer_down && self.state.hovered != self.state.held {
                    events.extend(self.release());
                    if let Some(note) = self.state.hovered {
                        events.push(self.press(note));
                    }
                }
            }
            PointerEvent::Down { x, y } => {
                self.state.pointer = Some((x, y));
                self.state.pointer_down = true;
                self.state.hovered = hit_test(x, y, layout);

                // A second button going down must not orphan the first note
                events.extend(self.release());
                if let Some(note) = self.state.hovered {
                    events.push(self.press(note));
                }
            }
            PointerEvent::Up { x, y } => {
                self.state.pointer = Some((x, y));
                self.state.pointer_down = false;
                self.state.hovered = hit_test(x, y, layout);
                events.extend(self.release());
            }
            PointerEvent::Leave => {
                self.state.pointer = None;
                self.state.pointer_down = false;
                self.state.hovered = None;
                events.extend(self.release());
            }
        }

        events
    }

    /// Re-resolve the hovered key after the layout changed under a still pointer
    pub fn refresh(&mut self, layout: &LayoutTable) {
        self.state.hovered = self
            .state
            .pointer
            .and_then(|(x, y)| hit_test(x, y, layout));
    }

    /// Stop the held note, if any
    pub fn release(&mut self) -> Option<NoteEvent> {
        self.state.held.take().map(|note| NoteEvent::Off { note })
    }

    fn press(&mut self, note: NoteId) -> NoteEvent {
        self.state.held = Some(note);
        NoteEvent::On {
            note,
            velocity: self.velocity,
        }
    }
}
