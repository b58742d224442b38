//! Progress channel lifecycle and frame decoding.
//!
//! Exactly one channel is live per generating run, bound to that run's task
//! identity. The pump task decodes raw frames and hands them to the
//! orchestrator's dispatch closure; dropping the guard (or calling
//! [`ChannelGuard::close`]) aborts the pump, which in turn drops the
//! transport receiver and lets the underlying connection unwind.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StageError;
use crate::types::ProgressEvent;

/// Transport seam for the streaming side of the protocol.
///
/// Given the channel URL for a task, yields raw text payloads until the
/// stream ends or the receiver is dropped. [`WsTransport`](crate::ws::WsTransport)
/// is the production implementation; tests script their own.
pub trait ProgressTransport: Send + Sync + 'static {
    fn open(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<mpsc::Receiver<String>, StageError>> + Send;
}

/// Decode one raw frame. Malformed payloads are logged and dropped; they
/// must never take down the channel or the task.
pub(crate) fn decode_frame(raw: &str) -> Option<ProgressEvent> {
    match serde_json::from_str(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed progress frame");
            None
        }
    }
}

/// Handle to one live channel. Aborting the pump is the teardown.
pub(crate) struct ChannelGuard {
    task_id: String,
    pump: JoinHandle<()>,
}

impl ChannelGuard {
    /// Spawn the pump: decode frames and feed them to `apply` until the
    /// transport closes, `apply` reports the orchestrator is gone (returns
    /// `false`), or the guard is dropped.
    pub(crate) fn spawn(
        task_id: String,
        mut rx: mpsc::Receiver<String>,
        mut apply: impl FnMut(ProgressEvent) -> bool + Send + 'static,
    ) -> Self {
        let id = task_id.clone();
        let pump = tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                if let Some(event) = decode_frame(&raw) {
                    if !apply(event) {
                        break;
                    }
                }
            }
            debug!(task_id = %id, "progress channel closed");
        });
        Self { task_id, pump }
    }

    pub(crate) fn close(self) {
        debug!(task_id = %self.task_id, "closing progress channel");
        self.pump.abort();
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgressStage;

    #[test]
    fn decodes_a_well_formed_frame() {
        let event = decode_frame(
            r#"{"stage":"generating","progress":25,"current":2,"total":8,"image_url":"https://img/2"}"#,
        )
        .expect("frame should decode");
        assert_eq!(event.stage, ProgressStage::Generating);
        assert_eq!(event.current, Some(2));
    }

    #[test]
    fn drops_malformed_frames() {
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame(r#"{"stage":"warp-drive","progress":5}"#).is_none());
        assert!(decode_frame(r#"{"progress":5}"#).is_none());
    }
}
