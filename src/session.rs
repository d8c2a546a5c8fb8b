//! Session worker
//!
//! One dedicated thread owns the `Assistant` (browser session and
//! conversation) and runs requests strictly one at a time from a queue. The
//! UI side submits through `SessionClient` and reads `Reply` events from a
//! channel, so it never blocks on a request.

use crate::types::{Outcome, Reply, RequestId};
use crate::Assistant;
use anyhow::{anyhow, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Cooperative cancellation, checked between request stages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the status indicator shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub llm_online: bool,
    pub browser_open: bool,
    pub busy: bool,
}

struct Request {
    id: RequestId,
    input: String,
    cancel: CancelFlag,
    done: oneshot::Sender<Outcome>,
}

enum SessionCmd {
    Run(Request),
    Shutdown(oneshot::Sender<()>),
}

/// A queued or running request
pub struct RequestHandle {
    id: RequestId,
    cancel: CancelFlag,
    done: oneshot::Receiver<Outcome>,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Ask the worker to abandon this request at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the request to finish. A worker that went away counts as cancelled.
    pub async fn wait(self) -> Outcome {
        self.done.await.unwrap_or(Outcome::Cancelled)
    }
}

/// UI-side handle to the session worker
pub struct SessionClient {
    tx: mpsc::UnboundedSender<SessionCmd>,
    pending: Arc<DashMap<RequestId, CancelFlag>>,
    status: Arc<RwLock<SessionStatus>>,
}

impl SessionClient {
    /// Queue `input` behind any outstanding requests
    pub fn submit(&self, input: impl Into<String>) -> Result<RequestHandle> {
        let id = RequestId::new();
        let cancel = CancelFlag::new();
        let (done_tx, done_rx) = oneshot::channel();

        self.pending.insert(id, cancel.clone());
        let request = Request {
            id,
            input: input.into(),
            cancel: cancel.clone(),
            done: done_tx,
        };

        if self.tx.send(SessionCmd::Run(request)).is_err() {
            self.pending.remove(&id);
            return Err(anyhow!("session worker has stopped"));
        }

        Ok(RequestHandle {
            id,
            cancel,
            done: done_rx,
        })
    }

    /// Cancel every queued or running request; returns how many were flagged
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in self.pending.iter() {
            entry.value().cancel();
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.read()
    }

    /// Quit the browser and stop the worker once the current request is done
    pub async fn shutdown(self) -> Result<()> {
        self.cancel_all();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(SessionCmd::Shutdown(ack_tx))
            .map_err(|_| anyhow!("session worker has stopped"))?;
        ack_rx
            .await
            .map_err(|_| anyhow!("session worker exited before acknowledging shutdown"))
    }
}

/// Start the worker thread. Replies for every request arrive on the returned receiver.
pub fn spawn_session(mut assistant: Assistant) -> Result<(SessionClient, mpsc::UnboundedReceiver<Reply>)> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionCmd>();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Reply>();
    let pending: Arc<DashMap<RequestId, CancelFlag>> = Arc::new(DashMap::new());
    let status = Arc::new(RwLock::new(SessionStatus::default()));

    // Init acknowledgement so we fail fast if the worker can't start.
    let (ack_tx, ack_rx) = std::sync::mpsc::channel::<Result<()>>();

    let worker_pending = pending.clone();
    let worker_status = status.clone();
    std::thread::Builder::new()
        .name("deskpilot-session".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ack_tx.send(Err(anyhow!("failed to build tokio runtime: {e}")));
                    return;
                }
            };
            let _ = ack_tx.send(Ok(()));

            rt.block_on(async move {
                let online = assistant.probe().await;
                worker_status.write().llm_online = online;

                while let Some(cmd) = rx.recv().await {
                    match cmd {
                        SessionCmd::Run(request) => {
                            let outcome = if request.cancel.is_cancelled() {
                                log::debug!("request {} cancelled before it started", request.id);
                                Outcome::Cancelled
                            } else {
                                worker_status.write().busy = true;
                                assistant.handle(&request.input, &request.cancel, &reply_tx).await
                            };

                            {
                                let mut status = worker_status.write();
                                status.busy = false;
                                status.browser_open = assistant.browser_open();
                                status.llm_online = assistant.llm_online();
                            }
                            worker_pending.remove(&request.id);
                            let _ = request.done.send(outcome);
                        }
                        SessionCmd::Shutdown(ack) => {
                            assistant.shutdown().await;
                            worker_status.write().browser_open = false;
                            let _ = ack.send(());
                            break;
                        }
                    }
                }

                log::info!("session worker stopped");
            });
        })?;

    ack_rx
        .recv_timeout(Duration::from_secs(2))
        .map_err(|_| anyhow!("session worker failed to start (timeout)"))??;

    Ok((SessionClient { tx, pending, status }, reply_rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let copy = flag.clone();

        assert!(!copy.is_cancelled());
        flag.cancel();
        assert!(copy.is_cancelled());
    }

    #[tokio::test]
    async fn test_handle_without_worker_counts_as_cancelled() {
        let (done_tx, done_rx) = oneshot::channel::<Outcome>();
        drop(done_tx);

        let handle = RequestHandle {
            id: RequestId::new(),
            cancel: CancelFlag::new(),
            done: done_rx,
        };
        assert_eq!(handle.wait().await, Outcome::Cancelled);
    }
}
