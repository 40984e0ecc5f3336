//! Fixed-size pool of worker tasks running per-agent jobs.

use island_core::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A unit of work executed on one of the pool's workers
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct JobTracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl JobTracker {
    fn started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn finished(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Workers pulling jobs off one shared queue.
///
/// Each worker hands its job to the blocking thread pool and waits for it,
/// so up to `size` jobs run in parallel regardless of how many runtime
/// threads there are, and the phase tickers are never starved.
pub struct WorkerPool {
    size: usize,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    tracker: Arc<JobTracker>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `size` workers on the current tokio runtime.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("worker pool needs at least one worker".into()));
        }
        let handle = Handle::try_current()
            .map_err(|e| Error::InvalidState(format!("no tokio runtime: {}", e)))?;

        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let tracker = Arc::new(JobTracker::default());

        let workers = (0..size)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let tracker = Arc::clone(&tracker);
                handle.spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else {
                            break;
                        };
                        match tokio::task::spawn_blocking(job).await {
                            Ok(()) => {}
                            Err(e) if e.is_panic() => warn!(worker, "Job panicked"),
                            Err(e) => warn!(worker, "Job did not complete: {}", e),
                        }
                        tracker.finished();
                    }
                    debug!(worker, "Worker stopped");
                })
            })
            .collect();

        debug!(size, "Worker pool started");
        Ok(Self {
            size,
            sender: Mutex::new(Some(sender)),
            tracker,
            workers: Mutex::new(workers),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs submitted but not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.pending()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Queue `job` for execution. Fails once the pool has been shut down.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(Error::PoolClosed);
        };

        self.tracker.started();
        if sender.send(Box::new(job)).is_err() {
            self.tracker.finished();
            return Err(Error::PoolClosed);
        }
        Ok(())
    }

    /// Wait until every submitted job has finished, or `timeout` elapses.
    ///
    /// Jobs still running at the deadline are left to finish on their own.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<()> {
        let drained = async {
            loop {
                let notified = self.tracker.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.tracker.pending() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, drained)
            .await
            .map_err(|_| Error::DrainTimeout {
                pending: self.in_flight(),
            })
    }

    /// Stop accepting jobs. Already queued jobs still run.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            debug!(size = self.size, "Worker pool closed");
        }
    }

    /// Close the pool and wait for every worker to exit.
    pub async fn join(&self) {
        self.shutdown();
        let workers = std::mem::take(&mut *self.workers.lock());
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                warn!("Worker task failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
