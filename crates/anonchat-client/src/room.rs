use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use anonchat_core::errors::JoinError;
use anonchat_core::room::RoomId;

/// How the client learns which room the backend has placed it into.
///
/// Injected into the session client so the exchange stays swappable: the real
/// deployment uses a join call, tests and demos can use the fixed-delay stub.
#[async_trait]
pub trait RoomAssigner: Send + Sync {
    async fn assign(&self) -> Result<RoomId, JoinError>;
}

#[derive(Deserialize)]
struct JoinResponse {
    room_id: RoomId,
}

/// Request/response room assignment: `POST {api}/chat/join` returning
/// `{"room_id": "..."}`.
pub struct HttpRoomAssigner {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRoomAssigner {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl RoomAssigner for HttpRoomAssigner {
    async fn assign(&self) -> Result<RoomId, JoinError> {
        let url = format!("{}/chat/join", self.api_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| JoinError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JoinError::Status {
                status: status.as_u16(),
            });
        }

        let body: JoinResponse = response
            .json()
            .await
            .map_err(|e| JoinError::Parse(e.to_string()))?;
        Ok(body.room_id)
    }
}

/// Simulated assignment: wait a fixed delay, then hand out a fixed room id.
/// Stands in for a backend exchange when none is available.
pub struct FixedDelayAssigner {
    delay: Duration,
    room_id: RoomId,
}

impl FixedDelayAssigner {
    pub fn new(delay: Duration, room_id: RoomId) -> Self {
        Self { delay, room_id }
    }
}

impl Default for FixedDelayAssigner {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            room_id: RoomId::from_raw("demo-room-id"),
        }
    }
}

#[async_trait]
impl RoomAssigner for FixedDelayAssigner {
    async fn assign(&self) -> Result<RoomId, JoinError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.room_id.clone())
    }
}
