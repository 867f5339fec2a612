use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use anonchat_core::errors::PollError;
use anonchat_core::message::{display_text, PollResponse};
use anonchat_core::room::RoomId;
use anonchat_core::session::PollHealth;

use crate::session::SnapshotPublisher;

/// One poll tick: fetch the room's full message list and map each record to
/// its display text.
pub async fn fetch_messages(
    client: &reqwest::Client,
    api_url: &str,
    room_id: &RoomId,
) -> Result<Vec<String>, PollError> {
    let url = format!("{api_url}/chat/{room_id}/messages");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| PollError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PollError::Status {
            status: status.as_u16(),
        });
    }

    let body: PollResponse = response
        .json()
        .await
        .map_err(|e| PollError::Parse(e.to_string()))?;
    Ok(body.messages.iter().map(|m| display_text(m)).collect())
}

/// Poll loop: while the room is set, replace the session's message list
/// wholesale on every tick. No merge, no dedup, no ordering beyond what the
/// backend returns.
///
/// A failed tick flips poll health to Failing and the loop keeps running;
/// the next good response flips it back. Cancellation stops the loop within
/// one tick but does not abort an in-flight request.
pub(crate) fn spawn_poller(
    client: reqwest::Client,
    api_url: String,
    room_id: RoomId,
    interval: Duration,
    publisher: Arc<SnapshotPublisher>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match fetch_messages(&client, &api_url, &room_id).await {
                        Ok(messages) => {
                            publisher.update(|snap| {
                                snap.messages = messages;
                                snap.poll_health = PollHealth::Healthy;
                            });
                        }
                        Err(e) => {
                            tracing::warn!(
                                room_id = %room_id,
                                kind = e.error_kind(),
                                error = %e,
                                "Poll tick failed"
                            );
                            let reason = e.to_string();
                            publisher.update(|snap| {
                                snap.poll_health = PollHealth::Failing { reason };
                            });
                        }
                    }
                }
            }
        }

        tracing::debug!(room_id = %room_id, "Poller stopped");
    })
}
