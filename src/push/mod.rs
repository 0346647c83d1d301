//! Push channel client
//!
//! Keeps a WebSocket open to the hub's push endpoint and forwards incoming
//! messages and typing events to the UI loop. Reconnects with exponential
//! backoff and reports connection state changes along the way.

pub mod events;
pub mod websocket;

pub use events::{ConnectionEvent, PushEvent};

use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use crate::backend::BackendResponse;

/// First reconnect delay; doubles on every consecutive failure.
const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 32;

/// Client heartbeat so idle connections are not reaped by proxies.
const HEARTBEAT_SECS: u64 = 30;

/// A session that lived this long counts as stable and resets the backoff.
const STABILITY_THRESHOLD: Duration = Duration::from_secs(60);

/// Reason one connected session ended.
enum SessionEnd {
    /// The UI loop is gone. Do not reconnect.
    Shutdown,
    /// The server or network dropped a stable session.
    Dropped(anyhow::Error),
}

/// Run the push connection until the UI goes away or reconnection gives up.
///
/// After `max_attempts` consecutive failed reconnects a final
/// [`ConnectionEvent::GaveUp`] is sent and the task ends.
pub async fn run(
    url: String,
    token: Option<String>,
    max_attempts: u32,
    tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let mut failures = 0u32;
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        match run_session(&url, token.as_deref(), &tx).await {
            Ok(SessionEnd::Shutdown) => return,
            Ok(SessionEnd::Dropped(e)) => {
                tracing::warn!("Push connection dropped after stable session: {:#}", e);
                failures = 0;
                backoff = INITIAL_BACKOFF_SECS;
            }
            Err(e) => {
                tracing::warn!("Push connection failed: {:#}", e);
            }
        }

        failures += 1;
        if failures > max_attempts {
            tracing::error!("Giving up on push connection after {} attempts", max_attempts);
            let _ = tx.send(BackendResponse::Connection(ConnectionEvent::GaveUp));
            return;
        }

        let event = ConnectionEvent::Disconnected { attempt: failures };
        if tx.send(BackendResponse::Connection(event)).is_err() {
            return;
        }

        tracing::info!("Reconnecting in {}s (attempt {})", backoff, failures);
        tokio::select! {
            _ = time::sleep(Duration::from_secs(backoff)) => {}
            _ = tx.closed() => return,
        }
        backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
    }
}

/// One connected session: connect, announce, pump frames.
///
/// Returns `Err` for failures that happened before the session became stable.
async fn run_session(
    url: &str,
    token: Option<&str>,
    tx: &mpsc::UnboundedSender<BackendResponse>,
) -> Result<SessionEnd> {
    let mut ws = websocket::HubSocket::connect(url, token).await?;

    if tx
        .send(BackendResponse::Connection(ConnectionEvent::Connected))
        .is_err()
    {
        return Ok(SessionEnd::Shutdown);
    }

    let connected_at = Instant::now();
    let mut heartbeat = time::interval(Duration::from_secs(HEARTBEAT_SECS));
    heartbeat.tick().await; // skip first immediate tick

    let end = loop {
        tokio::select! {
            frame = ws.recv_frame() => {
                match frame {
                    Ok(Some(text)) => {
                        let Some(event) = PushEvent::parse(&text) else {
                            continue;
                        };
                        if tx.send(BackendResponse::Push(event)).is_err() {
                            break SessionEnd::Shutdown;
                        }
                    }
                    Ok(None) => {
                        break SessionEnd::Dropped(anyhow::anyhow!("WebSocket closed by server"));
                    }
                    Err(e) => {
                        break SessionEnd::Dropped(e.context("WebSocket recv error"));
                    }
                }
            }
            _ = heartbeat.tick() => {
                if let Err(e) = ws.send_text(r#"{"type":"ping"}"#).await {
                    break SessionEnd::Dropped(e.context("Heartbeat send failed"));
                }
            }
            _ = tx.closed() => {
                break SessionEnd::Shutdown;
            }
        }
    };

    match end {
        SessionEnd::Dropped(e) if connected_at.elapsed() < STABILITY_THRESHOLD => Err(e),
        other => Ok(other),
    }
}

/// Derive the push URL from the REST base URL (`http` → `ws`, `https` → `wss`).
pub fn derive_push_url(server_url: &str) -> Result<String> {
    let mut url = url::Url::parse(server_url)?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => anyhow::bail!("Unsupported server URL scheme: {}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot switch {} to {}", server_url, scheme))?;
    let path = format!("{}/ws/chat", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_push_url() {
        assert_eq!(
            derive_push_url("http://localhost:9590").unwrap(),
            "ws://localhost:9590/ws/chat"
        );
        assert_eq!(
            derive_push_url("https://hub.school.example/heronix/").unwrap(),
            "wss://hub.school.example/heronix/ws/chat"
        );
    }

    #[test]
    fn test_derive_push_url_rejects_other_schemes() {
        tokio_test::assert_err!(derive_push_url("ftp://hub.example"));
        tokio_test::assert_err!(derive_push_url("not a url"));
    }

    #[tokio::test]
    async fn test_gives_up_when_unreachable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Port 9 on localhost: connection refused immediately.
        run("ws://127.0.0.1:9/ws/chat".to_string(), None, 0, tx).await;
        match rx.recv().await {
            Some(BackendResponse::Connection(ConnectionEvent::GaveUp)) => {}
            _ => panic!("expected GaveUp"),
        }
    }
}
