use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use anonchat_core::errors::ConnectError;
use anonchat_core::session::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTBOUND_QUEUE: usize = 64;

/// The one persistent connection a session holds.
///
/// Opened exactly once; a server close or transport error flips the state
/// watch to Disconnected and nothing attempts to reconnect. The socket is
/// owned by a background task and released on close or drop.
pub struct ChatConnection {
    outbound: mpsc::Sender<String>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    _task: tokio::task::JoinHandle<()>,
}

impl ChatConnection {
    /// Open the connection. Returns only once the WebSocket handshake has
    /// completed, so a successful return means Connected.
    pub async fn open(ws_url: &str) -> Result<Self, ConnectError> {
        let (ws, _) = connect_async(ws_url).await.map_err(|e| ConnectError {
            url: ws_url.to_string(),
            reason: e.to_string(),
        })?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_socket(ws, outbound_rx, state_tx, cancel.clone()));

        tracing::info!(url = %ws_url, "WebSocket connected");
        Ok(Self {
            outbound,
            state_rx,
            cancel,
            _task: task,
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Watch connection state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Queue one text frame for transmission. Returns false without sending
    /// anything when the connection is no longer open.
    pub fn try_send(&self, text: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.outbound.try_send(text.to_string()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to queue outbound frame");
                false
            }
        }
    }

    /// Close the connection. Idempotent; the socket task sends a Close frame
    /// and exits, flipping the state watch to Disconnected.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ChatConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Socket owner task: forwards queued text frames out, consumes inbound
/// frames, and reports the close.
///
/// The backend is not known to push anything over this connection, so inbound
/// text is tolerated and dropped rather than parsed.
async fn run_socket(
    ws: WsStream,
    mut outbound_rx: mpsc::Receiver<String>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            msg = outbound_rx.recv() => {
                match msg {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!(len = text.len(), "Dropping inbound frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket transport error");
                        break;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
    tracing::info!("WebSocket disconnected");
}
