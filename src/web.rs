//! Browser bindings
//!
//! Wires a `PianoApp` to the page: the canvas, a WebSocket, DOM input
//! events and the `requestAnimationFrame` loop. Everything registered here
//! is torn down again by `PianoHandle::dispose`.

use crate::app::PianoApp;
use crate::config::ClientOptions;
use crate::fingerprint::DeviceTraits;
use crate::input::PointerEvent;
use crate::layout::BoundingBox;
use crate::note::DisplayRange;
use crate::render::Surface;
use crate::session::Transport;
use anyhow::anyhow;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, CloseEvent, Document, Event, EventTarget, HtmlCanvasElement,
    KeyboardEvent, MessageEvent, MouseEvent, WebSocket, Window,
};

/// WebSocket carrying text frames
pub struct SocketTransport {
    socket: WebSocket,
}

impl SocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for SocketTransport {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.socket
            .send_with_str(text)
            .map_err(|e| anyhow!("WebSocket send failed: {:?}", e))
    }

    fn close(&mut self) {
        close_socket(&self.socket);
    }
}

/// 2D canvas drawing surface, on screen or offscreen
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2D canvas context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, context })
    }

    /// A canvas that is never attached to the document
    pub fn offscreen(document: &Document) -> Result<Self, JsValue> {
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        Self::new(canvas)
    }
}

impl Surface for CanvasSurface {
    fn resize(&mut self, width: u32, height: u32) {
        // Assigning a size clears the canvas, so skip no-op resizes
        if self.canvas.width() != width {
            self.canvas.set_width(width);
        }
        if self.canvas.height() != height {
            self.canvas.set_height(height);
        }
    }

    fn clear(&mut self) {
        self.context.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
    }

    fn fill_rect(&mut self, bounds: &BoundingBox, color: &str) {
        self.context.set_fill_style_str(color);
        self.context
            .fill_rect(bounds.x, bounds.y, bounds.width, bounds.height);
    }

    fn blit(&mut self, source: &Self) {
        if source.canvas.width() == 0 || source.canvas.height() == 0 {
            return;
        }
        if let Err(e) = self
            .context
            .draw_image_with_html_canvas_element(&source.canvas, 0.0, 0.0)
        {
            log::error!("Failed to blit keyboard buffer: {:?}", e);
        }
    }
}

struct ClientState {
    app: PianoApp<SocketTransport>,
    target: CanvasSurface,
    buffer: CanvasSurface,
}

type SharedState = Rc<RefCell<ClientState>>;

/// A DOM event listener that can be removed again
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }

    fn detach(&self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
        {
            log::warn!("Failed to remove {} listener: {:?}", self.kind, e);
        }
    }
}

/// Self-rescheduling `requestAnimationFrame` loop
struct AnimationLoop {
    window: Window,
    pending: Rc<Cell<Option<i32>>>,
    frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
}

impl AnimationLoop {
    fn start(window: &Window, state: SharedState) -> Result<Self, JsValue> {
        let pending = Rc::new(Cell::new(None));
        let frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));

        let callback = {
            let window = window.clone();
            let pending = Rc::clone(&pending);
            let frame = Rc::clone(&frame);
            Closure::wrap(Box::new(move |_timestamp: f64| {
                pending.set(None);
                {
                    let mut state = state.borrow_mut();
                    let ClientState { app, target, buffer } = &mut *state;
                    app.render(target, buffer);
                }
                if let Some(next) = frame.borrow().as_ref() {
                    if let Err(e) = schedule(&window, next, &pending) {
                        log::error!("Failed to request animation frame: {:?}", e);
                    }
                }
            }) as Box<dyn FnMut(f64)>)
        };

        schedule(window, &callback, &pending)?;
        *frame.borrow_mut() = Some(callback);

        Ok(Self {
            window: window.clone(),
            pending,
            frame,
        })
    }

    fn stop(&self) {
        if let Some(id) = self.pending.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("Failed to cancel animation frame: {:?}", e);
            }
        }
        // The frame closure holds a handle to itself; dropping it ends the loop
        self.frame.borrow_mut().take();
    }
}

fn schedule(
    window: &Window,
    callback: &Closure<dyn FnMut(f64)>,
    pending: &Cell<Option<i32>>,
) -> Result<(), JsValue> {
    let id = window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    pending.set(Some(id));
    Ok(())
}

/// Handle returned to the page; call `dispose()` before discarding the canvas
#[wasm_bindgen]
pub struct PianoHandle {
    state: SharedState,
    socket: WebSocket,
    socket_callbacks: Vec<Closure<dyn FnMut(Event)>>,
    listeners: Vec<Listener>,
    animation: AnimationLoop,
    disposed: bool,
}

#[wasm_bindgen]
impl PianoHandle {
    /// Show a different window of notes
    #[wasm_bindgen(js_name = setDisplayRange)]
    pub fn set_display_range(&self, lower: i32, upper: i32) -> Result<(), JsValue> {
        let range = DisplayRange::new(lower, upper).map_err(to_js_error)?;
        self.state.borrow_mut().app.set_display_range(range);
        Ok(())
    }

    /// Stop drawing, detach every listener, release held notes and close
    /// the socket. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.animation.stop();
        for listener in self.listeners.drain(..) {
            listener.detach();
        }

        unwire_socket(&self.socket);
        self.socket_callbacks.clear();

        let mut state = self.state.borrow_mut();
        state.app.release_all();
        state.app.session_mut().close();
        log::info!("Piano disposed");
    }
}

fn to_js_error(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

fn alert(window: &Window, message: &str) {
    if let Err(e) = window.alert_with_message(message) {
        log::error!("Failed to show alert '{}': {:?}", message, e);
    }
}

/// Refuse to start on browsers without WebSocket or 2D canvas support
fn check_capabilities(window: &Window, document: &Document) -> Result<(), JsValue> {
    let has_socket = js_sys::Reflect::has(window, &JsValue::from_str("WebSocket")).unwrap_or(false);
    if !has_socket {
        alert(window, "Sorry, WebSocket not supported on this browser.");
        return Err(JsValue::from_str("WebSocket not supported"));
    }

    let has_canvas = document
        .create_element("canvas")
        .ok()
        .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
        .and_then(|canvas| canvas.get_context("2d").ok().flatten())
        .is_some();
    if !has_canvas {
        alert(window, "Sorry, HTML5 Canvas not supported on this browser.");
        return Err(JsValue::from_str("Canvas not supported"));
    }

    Ok(())
}

fn parse_options(options: &JsValue) -> Result<ClientOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(ClientOptions::default());
    }
    let json: String = js_sys::JSON::stringify(options)?.into();
    ClientOptions::from_json(&json).map_err(to_js_error)
}

fn viewport_size(window: &Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0).max(0.0) as u32
    };
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

fn device_traits(window: &Window) -> DeviceTraits {
    let navigator = window.navigator();
    let screen = window.screen().ok();
    let screen_value = |read: fn(&web_sys::Screen) -> Result<i32, JsValue>| {
        screen
            .as_ref()
            .and_then(|s| read(s).ok())
            .unwrap_or(0)
            .max(0) as u32
    };

    DeviceTraits {
        user_agent: navigator.user_agent().unwrap_or_default(),
        language: navigator.language().unwrap_or_default(),
        platform: navigator.platform().unwrap_or_default(),
        screen_width: screen_value(web_sys::Screen::width),
        screen_height: screen_value(web_sys::Screen::height),
        color_depth: screen_value(web_sys::Screen::color_depth),
        timezone_offset: js_sys::Date::new_0().get_timezone_offset() as i32,
        hardware_concurrency: navigator.hardware_concurrency() as u32,
    }
}

/// Pointer position relative to the canvas
fn canvas_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> (f64, f64) {
    let rect = canvas.get_bounding_client_rect();
    (
        event.client_x() as f64 - rect.left(),
        event.client_y() as f64 - rect.top(),
    )
}

fn wire_socket(socket: &WebSocket, state: &SharedState) -> Vec<Closure<dyn FnMut(Event)>> {
    let on_open = {
        let state = Rc::clone(state);
        Closure::wrap(Box::new(move |_event: Event| {
            state.borrow_mut().app.session_mut().on_open();
        }) as Box<dyn FnMut(Event)>)
    };

    let on_message = {
        let state = Rc::clone(state);
        Closure::wrap(Box::new(move |event: Event| {
            let text = event
                .dyn_ref::<MessageEvent>()
                .and_then(|message| message.data().as_string())
                .unwrap_or_else(|| "<non-text frame>".to_string());
            state.borrow().app.session().on_message(&text);
        }) as Box<dyn FnMut(Event)>)
    };

    let on_close = {
        let state = Rc::clone(state);
        Closure::wrap(Box::new(move |event: Event| {
            if let Some(close) = event.dyn_ref::<CloseEvent>() {
                log::debug!("Socket closed with code {} '{}'", close.code(), close.reason());
            }
            let mut state = state.borrow_mut();
            state.app.session_mut().on_close();
            state.app.release_all();
        }) as Box<dyn FnMut(Event)>)
    };

    let on_error = {
        let state = Rc::clone(state);
        Closure::wrap(Box::new(move |event: Event| {
            state.borrow().app.session().on_error(&event.type_());
        }) as Box<dyn FnMut(Event)>)
    };

    socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    vec![on_open, on_message, on_close, on_error]
}

/// Remove the socket callbacks before their closures are dropped
fn unwire_socket(socket: &WebSocket) {
    socket.set_onopen(None);
    socket.set_onmessage(None);
    socket.set_onclose(None);
    socket.set_onerror(None);
}

fn close_socket(socket: &WebSocket) {
    if let Err(e) = socket.close() {
        log::warn!("Failed to close socket: {:?}", e);
    }
}

/// Attach the DOM listeners, pushing each one as it is attached so a
/// failure part way leaves the caller able to detach the rest
fn wire_input(
    window: &Window,
    canvas: &HtmlCanvasElement,
    state: &SharedState,
    listeners: &mut Vec<Listener>,
) -> Result<(), JsValue> {

    for kind in ["mousemove", "mousedown", "mouseup"] {
        let state = Rc::clone(state);
        let element = canvas.clone();
        listeners.push(Listener::attach(canvas, kind, move |event: Event| {
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let (x, y) = canvas_point(&element, mouse);
            let pointer = match kind {
                "mousedown" => PointerEvent::Down { x, y },
                "mouseup" => PointerEvent::Up { x, y },
                _ => PointerEvent::Move { x, y },
            };
            state.borrow_mut().app.pointer(pointer);
        })?);
    }

    {
        let state = Rc::clone(state);
        listeners.push(Listener::attach(canvas, "mouseleave", move |_event: Event| {
            state.borrow_mut().app.pointer(PointerEvent::Leave);
        })?);
    }

    {
        let state = Rc::clone(state);
        let viewport = window.clone();
        listeners.push(Listener::attach(window, "resize", move |_event: Event| {
            let (width, height) = viewport_size(&viewport);
            let mut state = state.borrow_mut();
            state.target.resize(width, height);
            state.app.resize(width, height);
        })?);
    }

    {
        let state = Rc::clone(state);
        listeners.push(Listener::attach(window, "keydown", move |event: Event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            // Leave browser shortcuts alone
            if key.ctrl_key() || key.meta_key() || key.alt_key() {
                return;
            }
            if state.borrow_mut().app.key_down(&key.key(), key.repeat()) {
                event.prevent_default();
            }
        })?);
    }

    {
        let state = Rc::clone(state);
        listeners.push(Listener::attach(window, "keyup", move |event: Event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if state.borrow_mut().app.key_up(&key.key()) {
                event.prevent_default();
            }
        })?);
    }

    {
        let state = Rc::clone(state);
        listeners.push(Listener::attach(window, "blur", move |_event: Event| {
            state.borrow_mut().app.release_all();
        })?);
    }

    Ok(())
}

/// Start the piano on the page.
///
/// `options` is a plain object matching `ClientOptions`; pass `undefined` for
/// the defaults. Setup halts (after alerting the user) when the browser lacks
/// WebSocket or canvas support or the socket cannot be created.
#[wasm_bindgen(js_name = startPiano)]
pub fn start_piano(options: JsValue) -> Result<PianoHandle, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document available"))?;
    check_capabilities(&window, &document)?;

    let options = parse_options(&options)?;

    // The keyboard fills the viewport; no scrollbars
    if let Some(body) = document.body() {
        body.style().set_property("overflow", "hidden")?;
    }

    let canvas = document
        .get_element_by_id(&options.canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("No canvas with id '{}'", options.canvas_id)))?
        .dyn_into::<HtmlCanvasElement>()?;
    let (width, height) = viewport_size(&window);
    let mut target = CanvasSurface::new(canvas.clone())?;
    target.resize(width, height);
    let buffer = CanvasSurface::offscreen(&document)?;

    let server_uri = options.server_uri();
    let socket = match WebSocket::new(&server_uri) {
        Ok(socket) => socket,
        Err(e) => {
            log::error!("Failed to open socket to {}: {:?}", server_uri, e);
            alert(&window, "Could not connect to server. Try refreshing.");
            return Err(e);
        }
    };

    let fingerprint = device_traits(&window).fingerprint();
    let app = match PianoApp::new(options, SocketTransport::new(socket.clone()), fingerprint, width, height) {
        Ok(app) => app,
        Err(e) => {
            close_socket(&socket);
            return Err(to_js_error(e));
        }
    };

    let state: SharedState = Rc::new(RefCell::new(ClientState { app, target, buffer }));
    let socket_callbacks = wire_socket(&socket, &state);
    let mut listeners = Vec::new();
    let started = wire_input(&window, &canvas, &state, &mut listeners)
        .and_then(|()| AnimationLoop::start(&window, Rc::clone(&state)));
    let animation = match started {
        Ok(animation) => animation,
        Err(e) => {
            log::error!("Failed to start piano: {:?}", e);
            for listener in &listeners {
                listener.detach();
            }
            unwire_socket(&socket);
            drop(socket_callbacks);
            close_socket(&socket);
            return Err(e);
        }
    };

    Ok(PianoHandle {
        state,
        socket,
        socket_callbacks,
        listeners,
        animation,
        disposed: false,
    })
}
