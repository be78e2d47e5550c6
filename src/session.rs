//! Server session
//!
//! Wraps an outbound transport with the connection handshake: once the
//! socket opens, the device fingerprint goes out first, then note frames.
//! Sends are fire-and-forget; nothing is queued, retried or acknowledged.

use crate::protocol::ClientMessage;

/// Something that can carry text frames to the server
pub trait Transport {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()>;

    fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

pub struct Session<T: Transport> {
    transport: T,
    fingerprint: String,
    state: ConnectionState,
    frames_sent: u64,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, fingerprint: String) -> Self {
        Self {
            transport,
            fingerprint,
            state: ConnectionState::Connecting,
            frames_sent: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The socket finished connecting; identify this device
    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            log::warn!("Ignoring socket open in state {:?}", self.state);
            return;
        }
        log::info!("Socket open");
        self.state = ConnectionState::Open;
        let handshake = ClientMessage::Fingerprint(self.fingerprint.clone());
        self.send(&handshake);
    }

    /// Inbound frames carry nothing we act on
    pub fn on_message(&self, text: &str) {
        log::info!("Socket message: {}", text);
    }

    pub fn on_error(&self, detail: &str) {
        log::error!("Socket error: {}", detail);
    }

    pub fn on_close(&mut self) {
        log::info!("Socket close");
        self.state = ConnectionState::Closed;
    }

    /// Send a frame if the connection is open. Returns whether it was handed
    /// to the transport; failures are logged and dropped.
    pub fn send(&mut self, message: &ClientMessage) -> bool {
        if !self.is_open() {
            log::warn!("Dropping '{}': socket is {:?}", message, self.state);
            return false;
        }

        match self.transport.send_text(&message.to_string()) {
            Ok(()) => {
                self.frames_sent += 1;
                true
            }
            Err(e) => {
                log::error!("Failed to send '{}': {:#}", message, e);
                false
            }
        }
    }

    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            self.transport.close();
            self.state = ConnectionState::Closed;
        }
    }
}
