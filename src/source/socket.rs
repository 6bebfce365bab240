//! Websocket reader for the flash stream. The endpoint pushes without any
//! subscription handshake; this adapter only reads, parses, and feeds the
//! reconciler, reconnecting with capped exponential backoff when the
//! connection drops.

use crate::reconciler::Reconciler;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

const INITIAL_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct FlashSocket;

impl FlashSocket {
    /// Spawns the connect/read loop for the flash-stream endpoint.
    pub fn spawn(
        ws_url: String,
        reconciler: Arc<Reconciler>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            Self::run(ws_url, reconciler, shutdown).await;
        })
    }

    async fn run(ws_url: String, reconciler: Arc<Reconciler>, shutdown: CancellationToken) {
        let mut backoff = INITIAL_RECONNECT_BACKOFF;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                connection = connect_async(ws_url.as_str()) => match connection {
                    Ok((stream, _)) => {
                        tracing::info!(url = %ws_url, "flash stream connected");
                        backoff = INITIAL_RECONNECT_BACKOFF;
                        Self::read_messages(stream, &reconciler, &shutdown).await;
                    }
                    Err(err) => {
                        reconciler.telemetry().record_transport_error();
                        tracing::warn!(error = %err, url = %ws_url, "flash stream connection failed");
                    }
                }
            }

            if shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_RECONNECT_BACKOFF);
        }

        tracing::info!("flash stream reader stopped");
    }

    async fn read_messages(
        mut stream: WsStream,
        reconciler: &Arc<Reconciler>,
        shutdown: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if !text.is_empty() {
                            reconciler.ingest_flash(&text);
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) if !text.is_empty() => reconciler.ingest_flash(text),
                        Ok(_) => {}
                        Err(err) => {
                            reconciler.telemetry().record_normalize_error();
                            tracing::warn!(error = %err, "dropping non-UTF-8 flash frame");
                        }
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "flash stream closed by server");
                        return;
                    }
                    Some(Err(err)) => {
                        reconciler.telemetry().record_transport_error();
                        tracing::warn!(error = %err, "flash stream read failed");
                        return;
                    }
                    None => {
                        tracing::info!("flash stream ended");
                        return;
                    }
                }
            }
        }
    }
}
