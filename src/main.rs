use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use anonchat_client::room::{FixedDelayAssigner, HttpRoomAssigner, RoomAssigner};
use anonchat_client::session::SessionClient;
use anonchat_core::config::ClientConfig;
use anonchat_core::session::{PollHealth, SessionSnapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(ws_url = %config.ws_url, api_url = %config.api_url, "Starting anonchat");

    // ANONCHAT_SIMULATE_JOIN skips the join call and hands out the demo room
    // after a short wait, for running against a bare echo backend.
    let assigner: Arc<dyn RoomAssigner> = if std::env::var("ANONCHAT_SIMULATE_JOIN").is_ok() {
        Arc::new(FixedDelayAssigner::default())
    } else {
        Arc::new(HttpRoomAssigner::new(
            reqwest::Client::new(),
            config.api_url.clone(),
        ))
    };

    println!("connecting...");
    let client = SessionClient::start(config, assigner).await?;

    let mut snapshots = client.subscribe();
    render(&snapshots.borrow_and_update());
    let renderer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snap = snapshots.borrow_and_update().clone();
            render(&snap);
        }
    });

    // Each stdin line becomes the draft and is sent immediately.
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    client.set_draft(line);
                    client.send_draft();
                }
                Ok(None) | Err(_) => break,
            }
        }
    }

    client.shutdown();
    renderer.abort();
    tracing::info!("Shutting down");
    Ok(())
}

fn render(snap: &SessionSnapshot) {
    if !snap.connection.is_connected() {
        println!("(disconnected)");
        return;
    }
    let Some(room_id) = &snap.room_id else {
        println!("(waiting for a room...)");
        return;
    };

    println!("-- room {room_id} --");
    if snap.messages.is_empty() {
        println!("(no messages yet)");
    }
    for message in &snap.messages {
        println!("{message}");
    }
    if let PollHealth::Failing { reason } = &snap.poll_health {
        println!("(message updates failing: {reason})");
    }
}
