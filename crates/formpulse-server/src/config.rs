//! Server Configuration

use formpulse_core::Form;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "FORMPULSE_CONFIG";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Seconds between keep-alive comments on live streams
    pub keepalive_secs: u64,
    /// Updates a viewer may have pending before new ones are dropped
    pub subscriber_buffer: usize,
    /// Events buffered between a stream task and its HTTP body
    pub stream_buffer: usize,
    /// Optional JSON array of forms loaded at startup
    pub forms_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            keepalive_secs: formpulse_core::stream::DEFAULT_KEEPALIVE.as_secs(),
            subscriber_buffer: formpulse_core::DEFAULT_SUBSCRIBER_CAPACITY,
            stream_buffer: 16,
            forms_path: None,
        }
    }
}

impl ServerConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// File named by `FORMPULSE_CONFIG` if readable, defaults otherwise,
    /// then `PORT` on top.
    pub fn from_env() -> Self {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Config {} unusable ({}), using defaults", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        if let Ok(port) = std::env::var("PORT") {
            config.apply_port(&port);
        }
        config
    }

    /// Replace the port of `bind_addr`, keeping its host.
    pub fn apply_port(&mut self, port: &str) {
        let port = port.trim();
        if port.is_empty() {
            return;
        }
        let host = self
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind_addr = format!("{host}:{port}");
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }
}

/// Read seed forms. Entries that fail validation are skipped with a warning.
pub fn load_forms(path: &str) -> Result<Vec<Form>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<Form> = serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut forms = Vec::with_capacity(raw.len());
    for mut form in raw {
        if form.id.trim().is_empty() {
            tracing::warn!("Skipping seed form '{}' without id", form.title);
            continue;
        }
        match form.sanitize() {
            Ok(()) => forms.push(form),
            Err(e) => tracing::warn!("Skipping seed form {}: {}", form.id, e),
        }
    }
    Ok(forms)
}
