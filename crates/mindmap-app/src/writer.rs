//! Ordered persistence for one session.
//!
//! Writes run one at a time on a single task, in the order they were queued,
//! so a write never reaches the store ahead of a write it depends on.

use mindmap_events::{EventBus, SessionEvent};
use mindmap_storage::StoreError;
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

type StoreWrite = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;

enum WriteJob {
    Write {
        what: &'static str,
        write: StoreWrite,
    },
    Barrier(oneshot::Sender<()>),
}

#[derive(Clone)]
pub(crate) struct WriteQueue {
    jobs: mpsc::UnboundedSender<WriteJob>,
}

impl WriteQueue {
    /// Starts the writer task. It exits once every clone of the queue is gone.
    pub(crate) fn spawn(runtime: &Handle, events: EventBus) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_writer(rx, events));
        Self { jobs }
    }

    pub(crate) fn push<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let job = WriteJob::Write {
            what,
            write: Box::pin(write),
        };
        if self.jobs.send(job).is_err() {
            tracing::error!(what, "Writer stopped; change not saved");
        }
    }

    /// Resolves once every write queued before this call has finished.
    pub(crate) async fn drained(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(WriteJob::Barrier(done)).is_ok() && wait.await.is_err() {
            tracing::error!("Writer stopped before draining");
        }
    }
}

async fn run_writer(mut jobs: mpsc::UnboundedReceiver<WriteJob>, events: EventBus) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Write { what, write } => {
                if let Err(error) = write.await {
                    tracing::error!(%error, what, "Failed to persist change");
                    events.publish(SessionEvent::error(format!("Could not save {what}: {error}")));
                }
            }
            WriteJob::Barrier(done) => {
                // The flusher may have stopped waiting.
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Writer finished");
}
