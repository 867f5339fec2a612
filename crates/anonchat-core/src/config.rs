use std::time::Duration;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/chat";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const ENV_WS_URL: &str = "ANONCHAT_WS_URL";
const ENV_API_URL: &str = "ANONCHAT_API_URL";

/// Client configuration. Built once and injected into the session client at
/// construction; nothing reads the environment after startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint for the persistent connection.
    pub ws_url: String,
    /// Base URL for the HTTP polling endpoint.
    pub api_url: String,
    /// Cadence of the message poll loop.
    pub poll_interval: Duration,
    /// Delay used by the simulated room-assignment strategy.
    pub join_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(1),
            join_delay: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    /// Resolve the two endpoint URLs from `ANONCHAT_WS_URL` / `ANONCHAT_API_URL`,
    /// falling back to the localhost defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_WS_URL) {
            if !url.is_empty() {
                config.ws_url = url;
            }
        }
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        config
    }
}
