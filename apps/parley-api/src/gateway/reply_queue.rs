//! Delayed delivery of auto-responder replies.
//!
//! Accepting a chat message enqueues a [`ReplyJob`]; a single worker sleeps
//! until the job is due and hands it to the router. Jobs are never cancelled.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::fanout::BroadcastRouter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyJob {
    pub text: String,
    pub due: Instant,
}

/// Producer half, held by the router.
#[derive(Clone)]
pub struct ReplyQueue {
    tx: mpsc::UnboundedSender<ReplyJob>,
    delay: Duration,
}

/// Consumer half, driven by [`ReplyWorker::spawn`].
pub struct ReplyWorker {
    rx: mpsc::UnboundedReceiver<ReplyJob>,
}

impl ReplyQueue {
    pub fn new(delay: Duration) -> (Self, ReplyWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, delay }, ReplyWorker { rx })
    }

    /// Queue `text` for delivery after the configured delay.
    pub fn schedule(&self, text: String) {
        let job = ReplyJob {
            text,
            due: Instant::now() + self.delay,
        };
        if self.tx.send(job).is_err() {
            tracing::warn!("reply worker stopped, dropping bot reply");
        }
    }
}

impl ReplyWorker {
    /// Start delivering jobs. The worker exits once the router is dropped.
    pub fn spawn(self, router: Weak<BroadcastRouter>) -> JoinHandle<()> {
        tokio::spawn(self.run(router))
    }

    async fn run(mut self, router: Weak<BroadcastRouter>) {
        while let Some(job) = self.rx.recv().await {
            time::sleep_until(job.due).await;
            let Some(router) = router.upgrade() else {
                break;
            };
            router.deliver_reply(job.text).await;
        }
        tracing::debug!("reply worker stopped");
    }
}
