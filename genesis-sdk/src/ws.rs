//! WebSocket implementation of the progress transport.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::channel::ProgressTransport;
use crate::error::StageError;

/// Production [`ProgressTransport`] over WebSocket.
///
/// The read loop runs in its own task and forwards text frames into a
/// bounded channel. It exits when the server closes, on a read error, or
/// when the consumer side is dropped; that last case also drops the socket
/// and closes the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl ProgressTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<mpsc::Receiver<String>, StageError> {
        let (mut stream, _response) = connect_async(url)
            .await
            .map_err(|e| StageError::Channel(e.to_string()))?;
        debug!(%url, "progress channel connected");

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        // send fails once the pump is gone; stop reading
                        if tx.send(text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary: nothing to forward
                    Err(e) => {
                        warn!(error = %e, "progress channel read error");
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}
