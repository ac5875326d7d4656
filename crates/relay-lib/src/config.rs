// ============================
// crates/relay-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Capacity assigned to rooms created on first join
    pub default_room_capacity: usize,
    /// Delay before a kicked member's session is closed, in milliseconds
    pub kick_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().expect("static addr"),
            log_level: "info".to_string(),
            default_room_capacity: 10,
            kick_delay_ms: 500,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and `CHAT_RELAY_`-prefixed
    /// environment variables, on top of the built-in defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings with an explicit config file path.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHAT_RELAY_"))
            .extract()?;
        Ok(settings)
    }
}
