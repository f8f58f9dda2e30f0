use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DispatcherClosed;
use crate::probe::{self, DEFAULT_PROBE_TIMEOUT};
use crate::store::ResultStore;
use crate::types::{IpStatus, QueryResponse, State};

/// One accepted scan: every target gets probed on `port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u64,
    pub port: u16,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Intake queue slots. A value of 1 makes submitters wait for the worker almost immediately.
    pub queue_capacity: usize,
    pub probe_timeout: Duration,
    /// Upper bound on probes in flight across all jobs. `None` means one task per target, unbounded.
    pub max_concurrent_probes: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent_probes: None,
        }
    }
}

/// Producer side of the intake queue. Clone it into every request handler.
#[derive(Clone, Debug)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Enqueue a job, waiting for a free slot if the queue is full.
    ///
    /// The pending result for `job.id` must already be in the store.
    pub async fn submit(&self, job: Job) -> Result<(), DispatcherClosed> {
        self.tx.send(job).await.map_err(|_| DispatcherClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// A queue with no worker behind it; the caller drains the receiver.
    #[cfg(test)]
    pub(crate) fn unattached(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

/// Owns the single worker loop that drains the intake queue.
#[derive(Debug)]
pub struct Dispatcher {
    queue: JobQueue,
    close: CancellationToken,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    /// Create the intake queue and spawn the worker loop on the current runtime.
    pub fn start(store: ResultStore, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let close = CancellationToken::new();
        let limiter = config
            .max_concurrent_probes
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        let worker = tokio::spawn(run_worker(
            rx,
            close.clone(),
            store,
            config.probe_timeout,
            limiter,
        ));

        Self {
            queue: JobQueue { tx },
            close,
            worker,
        }
    }

    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub async fn submit(&self, job: Job) -> Result<(), DispatcherClosed> {
        self.queue.submit(job).await
    }

    /// Close the intake queue. Jobs already queued are still handed out; new submits fail.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Close the queue and wait for the worker loop to exit.
    ///
    /// Jobs the worker already handed off keep running on their own tasks and are not awaited.
    pub async fn shutdown(self) {
        self.close();
        if let Err(e) = self.worker.await {
            warn!(error = %e, "dispatcher worker ended abnormally");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Job>,
    close: CancellationToken,
    store: ResultStore,
    probe_timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
) {
    let mut closing = false;
    loop {
        tokio::select! {
            biased;
            _ = close.cancelled(), if !closing => {
                rx.close();
                closing = true;
            }
            next = rx.recv() => {
                let Some(job) = next else { break };
                debug!(id = job.id, port = job.port, targets = job.targets.len(), "dequeued job");
                // Hand off and go straight back to the queue; jobs run concurrently with each other.
                tokio::spawn(process_job(job, store.clone(), probe_timeout, limiter.clone()));
            }
        }
    }
    info!("dispatcher intake queue closed");
}

/// Probe every target of `job` concurrently, then publish the final result in one write.
async fn process_job(
    job: Job,
    store: ResultStore,
    probe_timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
) {
    let Job { id, port, targets } = job;
    let mut set = JoinSet::new();

    for (index, ip) in targets.iter().cloned().enumerate() {
        let limiter = limiter.clone();
        set.spawn(async move {
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            let state = probe::probe(&ip, port, probe_timeout).await;
            (index, IpStatus { ip, state })
        });
    }

    let mut slots: Vec<Option<IpStatus>> = vec![None; targets.len()];
    while let Some(res) = set.join_next().await {
        match res {
            Ok((index, status)) => slots[index] = Some(status),
            Err(e) => warn!(id, error = %e, "probe task failed"),
        }
    }

    // Completion order is arbitrary; rebuild in submission order.
    let status: Vec<IpStatus> = targets
        .into_iter()
        .zip(slots)
        .map(|(ip, slot)| {
            slot.unwrap_or(IpStatus {
                ip,
                state: State::Closed,
            })
        })
        .collect();

    let open = status.iter().filter(|s| s.state == State::Open).count();
    store.put(id, QueryResponse::finished(port, status)).await;
    info!(id, port, open, "scan completed");
}
