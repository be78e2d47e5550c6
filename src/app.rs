//! Piano client state
//!
//! `PianoApp` owns everything a page load needs: the options, the current
//! layout, pointer and computer-keyboard input, the server session and the
//! renderer. It has no browser dependencies; the `web` module feeds it DOM
//! events and drives `render` once per animation frame.

use crate::config::ClientOptions;
use crate::input::{InputRouter, InputState, NoteEvent, PointerEvent};
use crate::keyboard::KeyboardInput;
use crate::layout::LayoutTable;
use crate::note::{DisplayRange, NoteId};
use crate::protocol::ClientMessage;
use crate::render::{KeyState, KeyboardRenderer, Surface};
use crate::session::{Session, Transport};
use std::collections::BTreeMap;

pub struct PianoApp<T: Transport> {
    options: ClientOptions,
    range: DisplayRange,
    layout: LayoutTable,
    router: InputRouter,
    keyboard: KeyboardInput,
    session: Session<T>,
    renderer: KeyboardRenderer,
    /// Note -> number of inputs (pointer, computer keys) holding it down
    held: BTreeMap<NoteId, u32>,
}

impl<T: Transport> PianoApp<T> {
    pub fn new(
        options: ClientOptions,
        transport: T,
        fingerprint: String,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        options.validate()?;
        let range = options.display_range()?;
        let layout = LayoutTable::recompute(range, width, height);
        let router = InputRouter::new(options.velocity).with_glide(options.glide);
        let keyboard = KeyboardInput::new(range.lower(), options.velocity);
        let fingerprint = options.fingerprint.clone().unwrap_or(fingerprint);

        log::info!(
            "Piano client for {} showing {} at {}x{}",
            options.server_uri(),
            range,
            width,
            height
        );

        Ok(Self {
            options,
            range,
            layout,
            router,
            keyboard,
            session: Session::new(transport, fingerprint),
            renderer: KeyboardRenderer::new(),
            held: BTreeMap::new(),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn layout(&self) -> &LayoutTable {
        &self.layout
    }

    pub fn input_state(&self) -> &InputState {
        self.router.state()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn keyboard(&self) -> &KeyboardInput {
        &self.keyboard
    }

    /// Notes currently sounding, lowest first
    pub fn held_notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.held.keys().copied()
    }

    /// The canvas changed size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.relayout(self.range, width, height);
    }

    /// Show a different window of notes. The computer keyboard is remapped
    /// to the new range; notes it was holding are released first.
    pub fn set_display_range(&mut self, range: DisplayRange) {
        if range != self.range {
            let released = self.keyboard.release_all();
            self.dispatch(released);
            self.keyboard = KeyboardInput::new(range.lower(), self.options.velocity);
        }
        self.relayout(range, self.layout.width(), self.layout.height());
    }

    fn relayout(&mut self, range: DisplayRange, width: u32, height: u32) {
        if self.layout.matches(range, width, height) {
            return;
        }
        log::info!("Recomputing layout for {} at {}x{}", range, width, height);
        self.range = range;
        self.layout = LayoutTable::recompute(range, width, height);
        self.router.refresh(&self.layout);
        self.renderer.invalidate();
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        let events = self.router.handle(event, &self.layout);
        self.dispatch(events);
    }

    /// Returns true if the key belongs to the piano
    pub fn key_down(&mut self, key: &str, repeat: bool) -> bool {
        match self.keyboard.key_down(key, repeat) {
            Some(events) => {
                self.dispatch(events);
                true
            }
            None => false,
        }
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        match self.keyboard.key_up(key) {
            Some(event) => {
                self.dispatch(vec![event]);
                true
            }
            None => false,
        }
    }

    /// Stop everything that is sounding (focus lost, teardown)
    pub fn release_all(&mut self) {
        let mut events: Vec<NoteEvent> = self.router.release().into_iter().collect();
        events.extend(self.keyboard.release_all());
        self.dispatch(events);
    }

    /// How a key should be drawn this frame
    pub fn key_state(&self, note: NoteId) -> KeyState {
        key_state_of(&self.held, self.router.state().hovered, note)
    }

    pub fn render<S: Surface>(&mut self, target: &mut S, buffer: &mut S) {
        let hovered = self.router.state().hovered;
        let held = &self.held;
        self.renderer.render_frame(target, buffer, &self.layout, &self.options.palette, |note| {
            key_state_of(held, hovered, note)
        });
    }

    /// Forward note events to the server. A note shared by several inputs
    /// starts with the first and stops with the last.
    fn dispatch(&mut self, events: Vec<NoteEvent>) {
        for event in events {
            let note = event.note();
            let forward = match event {
                NoteEvent::On { .. } => {
                    let count = self.held.entry(note).or_insert(0);
                    *count += 1;
                    *count == 1
                }
                NoteEvent::Off { .. } => match self.held.get_mut(&note) {
                    Some(count) if *count > 1 => {
                        *count -= 1;
                        false
                    }
                    Some(_) => {
                        self.held.remove(&note);
                        true
                    }
                    None => false,
                },
            };

            if forward {
                self.session.send(&ClientMessage::from(event));
            }
        }
    }
}

fn key_state_of(held: &BTreeMap<NoteId, u32>, hovered: Option<NoteId>, note: NoteId) -> KeyState {
    if held.contains_key(&note) {
        KeyState::Down
    } else if hovered == Some(note) {
        KeyState::Hover
    } else {
        KeyState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<String>,
    }

    impl Transport for Recorder {
        fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.frames.push(text.to_string());
            Ok(())
        }
    }

    fn app() -> PianoApp<Recorder> {
        let mut app = PianoApp::new(ClientOptions::default(), Recorder::default(), "fp".to_string(), 700, 400).unwrap();
        app.session_mut().on_open();
        app
    }

    fn frames(app: &PianoApp<Recorder>) -> Vec<String> {
        app.session().transport().frames.clone()
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = ClientOptions {
            lower_note: 80,
            upper_note: 70,
            ..ClientOptions::default()
        };
        assert!(PianoApp::new(options, Recorder::default(), "fp".to_string(), 700, 400).is_err());
    }

    #[test]
    fn test_fingerprint_override() {
        let options = ClientOptions {
            fingerprint: Some("seat-14".to_string()),
            ..ClientOptions::default()
        };
        let mut app = PianoApp::new(options, Recorder::default(), "computed".to_string(), 700, 400).unwrap();
        app.session_mut().on_open();
        assert_eq!(frames(&app), vec!["seat-14"]);
    }

    #[test]
    fn test_shared_note_sounds_until_last_release() {
        let mut app = app();
        // Pointer on C and the "a" key also plays C
        app.pointer(PointerEvent::Down { x: 10.0, y: 300.0 });
        assert!(app.key_down("a", false));
        app.pointer(PointerEvent::Up { x: 10.0, y: 300.0 });
        assert_eq!(app.held_notes().collect::<Vec<_>>(), vec![NoteId(60)]);
        assert!(app.key_up("a"));
        assert_eq!(frames(&app), vec!["fp", "on:60 127", "off:60"]);
        assert_eq!(app.held_notes().count(), 0);
    }

    #[test]
    fn test_unmapped_keys_are_ignored() {
        let mut app = app();
        assert!(!app.key_down("Enter", false));
        assert!(!app.key_up("Enter"));
        assert_eq!(frames(&app), vec!["fp"]);
    }

    #[test]
    fn test_release_all() {
        let mut app = app();
        app.pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        app.key_down("d", false);
        app.release_all();
        assert_eq!(frames(&app), vec!["fp", "on:61 127", "on:64 127", "off:61", "off:64"]);
        assert_eq!(app.held_notes().count(), 0);
    }

    #[test]
    fn test_resize_recomputes_layout() {
        let mut app = app();
        app.pointer(PointerEvent::Move { x: 150.0, y: 300.0 });
        assert_eq!(app.key_state(NoteId(62)), KeyState::Hover);

        app.resize(1400, 400);
        assert_eq!(app.layout().width(), 1400);
        assert_eq!(app.layout().get(NoteId(60)).unwrap().width, 200.0);
        assert_eq!(app.key_state(NoteId(60)), KeyState::Hover);
        assert_eq!(app.key_state(NoteId(62)), KeyState::Idle);
    }

    #[test]
    fn test_set_display_range() {
        let mut app = app();
        app.set_display_range(DisplayRange::new(48, 59).unwrap());
        assert!(app.layout().get(NoteId(60)).is_none());
        assert!(app.layout().get(NoteId(48)).is_some());
        assert_eq!(app.layout().width(), 700);
    }

    #[test]
    fn test_set_display_range_remaps_keyboard() {
        let mut app = app();
        app.key_down("a", false);
        app.set_display_range(DisplayRange::new(48, 59).unwrap());
        assert_eq!(app.keyboard().base_note(), NoteId(48));
        assert_eq!(app.held_notes().count(), 0);

        // The old key is no longer held, so its release sends nothing
        assert!(!app.key_up("a"));
        app.key_down("a", false);
        assert_eq!(frames(&app), vec!["fp", "on:60 127", "off:60", "on:48 127"]);
    }

    #[test]
    fn test_key_state_prefers_down() {
        let mut app = app();
        app.pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        assert_eq!(app.key_state(NoteId(61)), KeyState::Down);
        app.pointer(PointerEvent::Up { x: 100.0, y: 100.0 });
        assert_eq!(app.key_state(NoteId(61)), KeyState::Hover);
    }
}
