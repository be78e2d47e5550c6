//! Keyboard drawing
//!
//! The idle keyboard is painted once into an offscreen buffer and only
//! repainted after the layout changes. Each frame blits the buffer and then
//! paints hover/press highlights on top.

use crate::config::Palette;
use crate::layout::{BoundingBox, KeyRect, LayoutTable};
use crate::note::{KeyClass, NoteId};

/// A 2D drawing target
pub trait Surface {
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    fn fill_rect(&mut self, bounds: &BoundingBox, color: &str);

    /// Copy another surface of the same kind onto this one at the origin
    fn blit(&mut self, source: &Self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Idle,
    Hover,
    Down,
}

/// Fill and outline color for a key in a given state
pub fn key_colors(class: KeyClass, state: KeyState, palette: &Palette) -> (&str, &str) {
    match class {
        KeyClass::White => {
            let fill = match state {
                KeyState::Idle => &palette.key_white_color,
                KeyState::Hover => &palette.key_white_hover_color,
                KeyState::Down => &palette.key_white_down_color,
            };
            (fill.as_str(), palette.key_white_outline.as_str())
        }
        KeyClass::Black => {
            let fill = match state {
                KeyState::Idle => &palette.key_black_color,
                KeyState::Hover => &palette.key_black_hover_color,
                KeyState::Down => &palette.key_black_down_color,
            };
            (fill.as_str(), palette.key_black_outline.as_str())
        }
    }
}

fn paint_key<S: Surface>(surface: &mut S, key: &KeyRect, state: KeyState, palette: &Palette) {
    let (fill, outline) = key_colors(key.class, state, palette);
    surface.fill_rect(&key.bounds, outline);
    surface.fill_rect(&key.bounds.inset_leading(palette.key_spacing), fill);
}

pub struct KeyboardRenderer {
    dirty: bool,
}

impl Default for KeyboardRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardRenderer {
    pub fn new() -> Self {
        Self { dirty: true }
    }

    /// Force the buffer to be repainted on the next frame
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Draw one frame.
    ///
    /// `state_of` reports how each key should look; only non-idle keys are
    /// painted over the cached buffer.
    pub fn render_frame<S, F>(
        &mut self,
        target: &mut S,
        buffer: &mut S,
        layout: &LayoutTable,
        palette: &Palette,
        state_of: F,
    ) where
        S: Surface,
        F: Fn(NoteId) -> KeyState,
    {
        if self.dirty {
            buffer.resize(layout.width(), layout.height());
            buffer.clear();
            for key in layout.white_keys().chain(layout.black_keys()) {
                paint_key(buffer, key, KeyState::Idle, palette);
            }
            self.dirty = false;
        }

        target.clear();
        target.blit(buffer);

        let mut white_highlighted = false;
        for key in layout.white_keys() {
            let state = state_of(key.note);
            if state != KeyState::Idle {
                paint_key(target, key, state, palette);
                white_highlighted = true;
            }
        }

        // A highlighted white key covers the black keys beside it, so they
        // are repainted on top
        for key in layout.black_keys() {
            let state = state_of(key.note);
            if state != KeyState::Idle || white_highlighted {
                paint_key(target, key, state, palette);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::DisplayRange;

    #[derive(Default)]
    struct Recorder {
        size: (u32, u32),
        fills: Vec<(BoundingBox, String)>,
        clears: usize,
    }

    impl Surface for Recorder {
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.fills.clear();
        }

        fn fill_rect(&mut self, bounds: &BoundingBox, color: &str) {
            self.fills.push((*bounds, color.to_string()));
        }

        fn blit(&mut self, source: &Self) {
            self.fills.extend(source.fills.iter().cloned());
        }
    }

    fn octave() -> LayoutTable {
        LayoutTable::recompute(DisplayRange::new(60, 71).unwrap(), 700, 400)
    }

    #[test]
    fn test_buffer_painted_only_when_dirty() {
        let layout = octave();
        let palette = Palette::default();
        let mut renderer = KeyboardRenderer::new();
        let mut target = Recorder::default();
        let mut buffer = Recorder::default();

        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |_| KeyState::Idle);
        assert!(!renderer.is_dirty());
        assert_eq!(buffer.size, (700, 400));
        assert_eq!(buffer.clears, 1);
        // Outline plus fill for each of the 12 keys
        assert_eq!(buffer.fills.len(), 24);
        assert_eq!(target.fills.len(), 24);

        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |_| KeyState::Idle);
        assert_eq!(buffer.clears, 1);

        renderer.invalidate();
        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |_| KeyState::Idle);
        assert_eq!(buffer.clears, 2);
    }

    #[test]
    fn test_black_keys_drawn_over_white_keys() {
        let layout = octave();
        let palette = Palette::default();
        let mut renderer = KeyboardRenderer::new();
        let mut target = Recorder::default();
        let mut buffer = Recorder::default();

        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |_| KeyState::Idle);
        let last_white = buffer
            .fills
            .iter()
            .rposition(|(_, color)| *color == palette.key_white_color)
            .unwrap();
        let first_black = buffer
            .fills
            .iter()
            .position(|(_, color)| *color == palette.key_black_color)
            .unwrap();
        assert!(last_white < first_black);
    }

    #[test]
    fn test_highlight_overlay() {
        let layout = octave();
        let palette = Palette::default();
        let mut renderer = KeyboardRenderer::new();
        let mut target = Recorder::default();
        let mut buffer = Recorder::default();

        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |note| {
            if note == NoteId(61) {
                KeyState::Down
            } else {
                KeyState::Idle
            }
        });
        // Buffer blit, then outline and fill for C#
        assert_eq!(target.fills.len(), 24 + 2);
        let (bounds, color) = target.fills.last().unwrap();
        assert_eq!(color, &palette.key_black_down_color);
        assert_eq!(*bounds, layout.get(NoteId(61)).unwrap().inset_leading(palette.key_spacing));
    }

    #[test]
    fn test_white_highlight_repaints_black_keys() {
        let layout = octave();
        let palette = Palette::default();
        let mut renderer = KeyboardRenderer::new();
        let mut target = Recorder::default();
        let mut buffer = Recorder::default();

        renderer.render_frame(&mut target, &mut buffer, &layout, &palette, |note| {
            if note == NoteId(62) {
                KeyState::Hover
            } else {
                KeyState::Idle
            }
        });
        // D highlighted, then all five black keys repainted
        assert_eq!(target.fills.len(), 24 + 2 + 10);
        assert_eq!(target.fills[24 + 1].1, palette.key_white_hover_color);
        assert_eq!(target.fills.last().unwrap().1, palette.key_black_color);
    }

    #[test]
    fn test_key_colors() {
        let palette = Palette::default();
        assert_eq!(
            key_colors(KeyClass::Black, KeyState::Hover, &palette),
            (palette.key_black_hover_color.as_str(), palette.key_black_outline.as_str())
        );
        assert_eq!(
            key_colors(KeyClass::White, KeyState::Down, &palette),
            (palette.key_white_down_color.as_str(), palette.key_white_outline.as_str())
        );
    }
}
