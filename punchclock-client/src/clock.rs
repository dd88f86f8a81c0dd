use crate::api_client::ApiClient;
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::error::ClientError;
use crate::queue::EventQueue;
use punchclock_common::api::{ClockRequest, EntryView};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutcome {
    /// The server committed the event directly.
    Recorded(EntryView),
    /// The event is waiting in the local queue.
    Queued { id: i64, pending: i64 },
}

/// Writes a clock event to the server when possible and to the local queue otherwise.
#[derive(Clone)]
pub struct ClockService {
    api: ApiClient,
    queue: EventQueue,
    monitor: Arc<ConnectivityMonitor>,
}

impl ClockService {
    pub fn new(api: ApiClient, queue: EventQueue, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self {
            api,
            queue,
            monitor,
        }
    }

    /// A rejection from the server is returned as is and nothing is queued, since replaying
    /// the same request can not succeed.
    pub async fn record(&self, req: &ClockRequest) -> Result<ClockOutcome, ClientError> {
        if !self.monitor.is_online() {
            debug!("offline, queueing {} for {}", req.action, req.human_employee_id);
            return self.enqueue(req).await;
        }

        match self.api.clock(req).await {
            Ok(entry) => Ok(ClockOutcome::Recorded(entry)),
            Err(err) if err.is_transient() => {
                warn!("direct write failed, queueing: {err}");
                self.monitor.set(Connectivity::Offline);
                self.enqueue(req).await
            }
            Err(err) => Err(err),
        }
    }

    async fn enqueue(&self, req: &ClockRequest) -> Result<ClockOutcome, ClientError> {
        let id = self.queue.append(&req.to_pending()).await?;
        let pending = self.queue.count().await?;
        Ok(ClockOutcome::Queued { id, pending })
    }
}
