use crate::note::DisplayRange;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Client options, supplied by the hosting page as a JSON object
///
/// Every field is optional; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Server host name or address
    #[serde(alias = "server_ip")]
    pub server_host: String,
    pub server_port: u16,
    /// Velocity sent with every note-on (1-127)
    pub velocity: u8,
    /// Lowest note drawn
    pub lower_note: i32,
    /// Highest note drawn
    pub upper_note: i32,
    /// Slide between keys while the pointer is held down
    pub glide: bool,
    /// DOM id of the canvas element
    pub canvas_id: String,
    /// Use this instead of the computed device fingerprint
    pub fingerprint: Option<String>,
    pub palette: Palette,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 8080,
            velocity: 127,
            lower_note: 60,
            upper_note: 71,
            glide: false,
            canvas_id: "piano".to_string(),
            fingerprint: None,
            palette: Palette::default(),
        }
    }
}

impl ClientOptions {
    /// Parse and validate options from JSON
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let options: ClientOptions =
            serde_json::from_str(json).context("Failed to parse piano options")?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.server_host.trim().is_empty(), "server_host must not be empty");
        ensure!(
            (1..=127).contains(&self.velocity),
            "velocity {} is outside 1-127",
            self.velocity
        );
        ensure!(
            self.palette.key_spacing.is_finite() && self.palette.key_spacing >= 0.0,
            "key_spacing must be a non-negative number"
        );
        self.display_range()?;
        Ok(())
    }

    pub fn display_range(&self) -> anyhow::Result<DisplayRange> {
        DisplayRange::new(self.lower_note, self.upper_note)
    }

    pub fn server_uri(&self) -> String {
        format!("ws://{}:{}", self.server_host, self.server_port)
    }
}

/// Key colors as CSS color strings, plus the gap drawn between keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub key_white_color: String,
    pub key_white_outline: String,
    pub key_white_hover_color: String,
    pub key_white_down_color: String,
    pub key_black_color: String,
    pub key_black_outline: String,
    pub key_black_hover_color: String,
    pub key_black_down_color: String,
    /// Pixels of outline left on each key's left and top edge
    pub key_spacing: f64,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            key_white_color: "#ffffff".to_string(),
            key_white_outline: "#000000".to_string(),
            key_white_hover_color: "#dde6ff".to_string(),
            key_white_down_color: "#6496ff".to_string(),
            key_black_color: "#111111".to_string(),
            key_black_outline: "#000000".to_string(),
            key_black_hover_color: "#3a3f5c".to_string(),
            key_black_down_color: "#3264c8".to_string(),
            key_spacing: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteId;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::from_json("{}").unwrap();
        assert_eq!(options, ClientOptions::default());
        assert_eq!(options.server_uri(), "ws://localhost:8080");
        let range = options.display_range().unwrap();
        assert_eq!(range.lower(), NoteId(60));
        assert_eq!(range.upper(), NoteId(71));
    }

    #[test]
    fn test_partial_options() {
        let options = ClientOptions::from_json(
            r##"{
                "server_ip": "192.168.1.20",
                "server_port": 9000,
                "lower_note": 48,
                "upper_note": 83,
                "palette": { "key_white_down_color": "rgb(255, 0, 0)", "key_spacing": 1 }
            }"##,
        )
        .unwrap();
        assert_eq!(options.server_uri(), "ws://192.168.1.20:9000");
        assert_eq!(options.palette.key_white_down_color, "rgb(255, 0, 0)");
        assert_eq!(options.palette.key_spacing, 1.0);
        // Untouched palette entries keep their defaults
        assert_eq!(options.palette.key_white_color, "#ffffff");
        assert_eq!(options.velocity, 127);
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let err = ClientOptions::from_json(r#"{"lower_note": 72, "upper_note": 60}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid display range"));
    }

    #[test]
    fn test_oversized_range_is_rejected() {
        let err = ClientOptions::from_json(r#"{"lower_note": -2147483648, "upper_note": 2147483647}"#)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("spans more than"));
        assert!(ClientOptions::from_json(r#"{"lower_note": 21, "upper_note": 108}"#).is_ok());
    }

    #[test]
    fn test_invalid_velocity_is_rejected() {
        assert!(ClientOptions::from_json(r#"{"velocity": 0}"#).is_err());
        assert!(ClientOptions::from_json(r#"{"velocity": 128}"#).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = ClientOptions::from_json("{ server_port: ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse piano options"));
    }
}
