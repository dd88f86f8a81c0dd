use crate::api_client::ApiClient;
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::error::ClientError;
use crate::queue::EventQueue;
use punchclock_common::api::PendingEvent;
use punchclock_common::domain::Outcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An acknowledged event the server would not commit. It has left the queue and has to be
/// fixed by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub event: PendingEvent,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub submitted: usize,
    pub synced: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub needs_correction: Vec<Correction>,
}

struct Inner {
    queue: EventQueue,
    api: ApiClient,
    monitor: Arc<ConnectivityMonitor>,
    in_flight: AtomicBool,
}

/// Released on drop, so a drain that errors or panics still frees the slot.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drains the event queue into the server. At most one drain runs at a time.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(queue: EventQueue, api: ApiClient, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue,
                api,
                monitor,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Starts a drain in the background unless one is already running. Needs a tokio runtime.
    pub fn trigger(&self) {
        if self.is_syncing() {
            debug!("sync already in flight");
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            match this.sync_now().await {
                Ok(Some(report)) => info!(
                    "background sync: {} synced, {} duplicates, {} failed",
                    report.synced, report.duplicates, report.failed
                ),
                Ok(None) => {}
                Err(err) => warn!("background sync failed {err}"),
            }
        });
    }

    /// Runs one drain. Returns `None` when another drain holds the slot.
    pub async fn sync_now(&self) -> Result<Option<SyncReport>, ClientError> {
        let Some(_guard) = InFlight::acquire(&self.inner.in_flight) else {
            debug!("sync already in flight");
            return Ok(None);
        };

        match self.drain().await {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                if err.is_transient() {
                    self.inner.monitor.set(Connectivity::Offline);
                }
                Err(err)
            }
        }
    }

    async fn drain(&self) -> Result<SyncReport, ClientError> {
        let snapshot = self.inner.queue.peek_all().await?;
        if snapshot.is_empty() {
            debug!("nothing to sync");
            return Ok(SyncReport::default());
        }

        let events: Vec<PendingEvent> = snapshot.iter().map(|x| x.event.clone()).collect();
        let res = self.inner.api.submit_batch(&events).await?;

        // Results are positional. Anything else leaves the queue as it was.
        if res.results.len() != snapshot.len() {
            return Err(ClientError::InvalidResponse(format!(
                "expected {} results, got {}",
                snapshot.len(),
                res.results.len()
            )));
        }
        let outcomes = res
            .results
            .iter()
            .map(|x| x.outcome())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ClientError::InvalidResponse)?;

        let mut report = SyncReport {
            submitted: snapshot.len(),
            ..SyncReport::default()
        };
        let mut acknowledged = Vec::with_capacity(snapshot.len());

        for (queued, outcome) in snapshot.into_iter().zip(outcomes) {
            acknowledged.push(queued.id);
            match outcome {
                Outcome::Success { .. } => report.synced += 1,
                Outcome::Duplicate => report.duplicates += 1,
                outcome => {
                    report.failed += 1;
                    error!(
                        "event for {} needs correction: {}",
                        queued.event.human_employee_id,
                        outcome.error_message().unwrap_or_default()
                    );
                    report.needs_correction.push(Correction {
                        event: queued.event,
                        outcome,
                    });
                }
            }
        }

        self.inner.queue.remove_acknowledged(&acknowledged).await?;
        info!(
            "synced {} events ({} duplicates, {} need correction)",
            report.synced, report.duplicates, report.failed
        );

        Ok(report)
    }
}
