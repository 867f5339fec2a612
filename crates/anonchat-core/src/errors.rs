/// Opening the persistent connection failed. There is no retry path: the
/// session simply never reaches Connected.
#[derive(Clone, Debug, thiserror::Error)]
#[error("websocket connect to {url} failed: {reason}")]
pub struct ConnectError {
    pub url: String,
    pub reason: String,
}

/// One poll tick failed. Never fatal: surfaced as a Failing poll-health
/// state while the loop keeps running.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PollError {
    #[error("poll request failed: {0}")]
    Request(String),
    #[error("poll returned HTTP {status}")]
    Status { status: u16 },
    #[error("poll response parse failed: {0}")]
    Parse(String),
}

impl PollError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::Parse(_) => "parse",
        }
    }
}

/// Room acquisition failed. The session stays connected but never starts
/// polling; there is no automatic re-join.
#[derive(Clone, Debug, thiserror::Error)]
pub enum JoinError {
    #[error("join request failed: {0}")]
    Request(String),
    #[error("join returned HTTP {status}")]
    Status { status: u16 },
    #[error("join response parse failed: {0}")]
    Parse(String),
}

impl JoinError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::Parse(_) => "parse",
        }
    }
}
