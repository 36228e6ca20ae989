//! Configuration system.
//!
//! Loads arena configuration from JSON. Every field has a default so partial
//! files are accepted.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Relay server address, e.g. `127.0.0.1:40000`.
    pub server_addr: String,
    /// Server broadcast rate.
    pub tick_hz: u32,
    /// Client frame rate.
    pub frame_hz: u32,
    /// Player name (client only).
    pub player_name: String,
    pub window: WindowConfig,
    pub movement: MovementConfig,
    pub keys: KeyBindings,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:40000".to_string(),
            tick_hz: 64,
            frame_hz: 60,
            player_name: "Player".to_string(),
            window: WindowConfig::default(),
            movement: MovementConfig::default(),
            keys: KeyBindings::default(),
        }
    }
}

impl ArenaConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}

/// Initial window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Tuning for the player movement system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Forward speed in units per second.
    pub speed: f32,
    /// Yaw change per frame while turning. Not scaled by frame time.
    pub yaw_step: f32,
    /// Yaw is clamped to `[-yaw_limit, yaw_limit]`.
    pub yaw_limit: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 7.0,
            yaw_step: 0.01,
            yaw_limit: 0.6,
        }
    }
}

/// Keys mapped to player controller intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: char,
    pub backward: char,
    pub left: char,
    pub right: char,
    pub shoot: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: 'w',
            backward: 's',
            left: 'a',
            right: 'd',
            shoot: 'q',
        }
    }
}
