pub mod app;
pub mod config;
pub mod fingerprint;
pub mod input;
pub mod keyboard;
pub mod layout;
pub mod note;
pub mod protocol;
pub mod render;
pub mod session;
#[cfg(feature = "wasm")]
pub mod web;

pub use app::PianoApp;
pub use config::{ClientOptions, Palette};
pub use input::{hit_test, InputRouter, NoteEvent, PointerEvent};
pub use layout::{BoundingBox, KeyRect, LayoutTable};
pub use note::{DisplayRange, KeyClass, NoteId};
pub use protocol::ClientMessage;
pub use render::{KeyState, KeyboardRenderer, Surface};
pub use session::{ConnectionState, Session, Transport};

#[cfg(feature = "wasm")]
mod wasm_imports {
    pub use wasm_bindgen::prelude::*;
    pub use web_sys::console;
}
#[cfg(feature = "wasm")]
use wasm_imports::*;

#[cfg(feature = "wasm")]
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Writes log records to the browser console
#[cfg(feature = "wasm")]
struct ConsoleLogger;

#[cfg(feature = "wasm")]
impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} [{}:{}] {}",
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        );
        match record.level() {
            Level::Error => console::error_1(&line.into()),
            Level::Warn => console::warn_1(&line.into()),
            _ => console::log_1(&line.into()),
        }
    }

    fn flush(&self) {}
}

#[cfg(feature = "wasm")]
static LOGGER: ConsoleLogger = ConsoleLogger;

#[cfg(feature = "wasm")]
pub fn init_console_logger() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

// This is like the `main` function, except for JavaScript.
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    // This provides better error messages in debug mode.
    // It's disabled in release mode so it doesn't bloat up the file size.
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once();
    init_console_logger()
        .map_err(|e| JsValue::from_str(&format!("Failed to initialize console logger: {}", e)))?;

    log::info!("Logger initialized");

    Ok(())
}
