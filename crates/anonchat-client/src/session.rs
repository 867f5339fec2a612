use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use anonchat_core::config::ClientConfig;
use anonchat_core::errors::ConnectError;
use anonchat_core::session::{ConnectionState, SessionSnapshot};

use crate::connection::ChatConnection;
use crate::poller;
use crate::room::RoomAssigner;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes the observable session state. Equal snapshots are not
/// re-published, so subscribers only wake on real changes.
pub(crate) struct SnapshotPublisher {
    tx: watch::Sender<SessionSnapshot>,
}

impl SnapshotPublisher {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx }
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let _ = self.tx.send_if_modified(|snap| {
            let before = snap.clone();
            f(snap);
            *snap != before
        });
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }
}

/// The chat session client: one connection, one room, one poll loop.
///
/// Created with [`SessionClient::start`], observed through [`subscribe`],
/// destroyed with [`shutdown`] (or drop). There is no reconnect: a dropped
/// connection flips the snapshot to Disconnected and stays there.
///
/// [`subscribe`]: SessionClient::subscribe
/// [`shutdown`]: SessionClient::shutdown
pub struct SessionClient {
    connection: Arc<ChatConnection>,
    publisher: Arc<SnapshotPublisher>,
    draft: Mutex<String>,
    cancel: CancellationToken,
    _lifecycle: tokio::task::JoinHandle<()>,
}

impl SessionClient {
    /// Open the persistent connection and drive the session lifecycle:
    /// connect, acquire a room through `assigner`, then poll for messages
    /// until shutdown.
    pub async fn start(
        config: ClientConfig,
        assigner: Arc<dyn RoomAssigner>,
    ) -> Result<Self, ConnectError> {
        let publisher = Arc::new(SnapshotPublisher::new());

        let connection = Arc::new(ChatConnection::open(&config.ws_url).await?);
        publisher.update(|snap| snap.connection = ConnectionState::Connected);

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        let cancel = CancellationToken::new();
        let lifecycle = tokio::spawn(run_lifecycle(
            config,
            assigner,
            http,
            Arc::clone(&connection),
            Arc::clone(&publisher),
            cancel.clone(),
        ));

        Ok(Self {
            connection,
            publisher,
            draft: Mutex::new(String::new()),
            cancel,
            _lifecycle: lifecycle,
        })
    }

    /// Watch session state changes. This is the render seam.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.publisher.subscribe()
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.publisher.snapshot()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock() = text.into();
    }

    pub fn draft(&self) -> String {
        self.draft.lock().clone()
    }

    /// Transmit the current draft over the persistent connection and clear
    /// it.
    ///
    /// An empty draft or a lost connection is a silent no-op: nothing is
    /// sent, no error is surfaced, and the draft stays as it was. There is
    /// no acknowledgment path; a sent message is only observed again through
    /// polling.
    pub fn send_draft(&self) -> bool {
        let mut draft = self.draft.lock();
        if draft.is_empty() || !self.connection.is_connected() {
            return false;
        }
        if self.connection.try_send(&draft) {
            draft.clear();
            true
        } else {
            false
        }
    }

    /// Tear the session down: stop the poll loop and close the connection.
    /// Idempotent; dropping the client does the same.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.connection.close();
        // The lifecycle task exits on cancel before the socket close lands,
        // so publish the terminal state here.
        self.publisher
            .update(|snap| snap.connection = ConnectionState::Disconnected);
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_lifecycle(
    config: ClientConfig,
    assigner: Arc<dyn RoomAssigner>,
    http: reqwest::Client,
    connection: Arc<ChatConnection>,
    publisher: Arc<SnapshotPublisher>,
    cancel: CancellationToken,
) {
    let mut state_rx = connection.watch_state();

    // Room acquisition runs only while connected; a disconnect aborts it and
    // the session never starts polling.
    let room_id = tokio::select! {
        () = cancel.cancelled() => return,
        _ = state_rx.wait_for(|s| !s.is_connected()) => {
            publisher.update(|snap| snap.connection = ConnectionState::Disconnected);
            return;
        }
        result = assigner.assign() => match result {
            Ok(room_id) => room_id,
            Err(e) => {
                tracing::error!(kind = e.error_kind(), error = %e, "Room acquisition failed");
                return;
            }
        }
    };

    tracing::info!(room_id = %room_id, "Room assigned");
    publisher.update(|snap| snap.room_id = Some(room_id.clone()));

    // Once a room is known, poll until shutdown. The poll path is HTTP and
    // outlives the WebSocket: a dropped connection only flips the flag.
    let _poller = poller::spawn_poller(
        http,
        config.api_url.clone(),
        room_id,
        config.poll_interval,
        Arc::clone(&publisher),
        cancel.clone(),
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                let closed = changed.is_err();
                let state = if closed {
                    ConnectionState::Disconnected
                } else {
                    *state_rx.borrow_and_update()
                };
                publisher.update(|snap| snap.connection = state);
                if closed {
                    break;
                }
            }
        }
    }
}
