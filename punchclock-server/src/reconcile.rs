use crate::error::StoreError;
use crate::models::{storable, AuditRecord, CanonicalEntry, NewEntry};
use async_trait::async_trait;
use punchclock_common::api::{EntryView, SyncEntryResult, SyncResponse};
use punchclock_common::domain::{Entity, EventSource, Outcome};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_SKEW_THRESHOLD: Duration = Duration::minutes(2);
pub const OFFLINE_SYNC_ACTION: &str = "OFFLINE_SYNC";
const MISSING_FIELDS: &str = "missing required fields";
const CLOCK_OUT_ONLY: &str = "clock-out recorded without a clock-in";
const OUT_OF_RANGE: &str = "timestamp out of range";

/// Resolves human facing codes to canonical references.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    async fn resolve_employee(&self, code: &str) -> Result<Option<Uuid>, StoreError>;
    async fn resolve_terminal(&self, code: &str) -> Result<Option<Uuid>, StoreError>;
}

/// The authoritative store of canonical entries. `insert` must report a violation of the
/// `(employee_ref, clock_in)` uniqueness as [`StoreError::Conflict`].
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_employee_and_clock_in(
        &self,
        employee_ref: Uuid,
        clock_in: OffsetDateTime,
    ) -> Result<Option<CanonicalEntry>, StoreError>;

    async fn insert(&self, entry: NewEntry) -> Result<CanonicalEntry, StoreError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<(), StoreError>;
}

/// Loose decoding of a submitted entry. Every field is optional so that a missing field
/// becomes a per entry rejection instead of failing the whole batch.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedEvent {
    #[serde(default)]
    human_employee_id: Option<String>,
    #[serde(default)]
    human_terminal_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    clock_in: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    clock_out: Option<OffsetDateTime>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    captured_at: Option<OffsetDateTime>,
}

struct ValidEvent {
    employee: String,
    terminal: Option<String>,
    clock_in: Option<OffsetDateTime>,
    clock_out: Option<OffsetDateTime>,
    notes: Option<String>,
    captured_at: OffsetDateTime,
}

impl ValidEvent {
    fn decode(value: &serde_json::Value) -> Result<Self, String> {
        let event: SubmittedEvent = serde_json::from_value(value.clone())
            .map_err(|err| format!("malformed entry: {err}"))?;

        let employee = event
            .human_employee_id
            .filter(|x| !x.trim().is_empty())
            .ok_or(MISSING_FIELDS)?;
        let captured_at = event.captured_at.ok_or(MISSING_FIELDS)?;
        if event.clock_in.is_none() && event.clock_out.is_none() {
            return Err(MISSING_FIELDS.into());
        }
        let times = [event.clock_in, event.clock_out, Some(captured_at)];
        if !times.into_iter().flatten().all(storable) {
            return Err(OUT_OF_RANGE.into());
        }

        Ok(Self {
            employee,
            terminal: event.human_terminal_id.filter(|x| !x.trim().is_empty()),
            clock_in: event.clock_in,
            clock_out: event.clock_out,
            notes: event.notes,
            captured_at,
        })
    }

    /// The dedup key half. A bare clock-out is committed as a zero length entry.
    fn key_time(&self) -> OffsetDateTime {
        self.clock_in.or(self.clock_out).unwrap_or(self.captured_at)
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(serde_json::Value, Outcome)>,
    pub synced: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl BatchReport {
    fn push(&mut self, entry: serde_json::Value, outcome: Outcome) {
        match outcome {
            Outcome::Success { .. } => self.synced += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::EntityNotFound(_) | Outcome::Rejected(_) => self.failed += 1,
        }
        self.results.push((entry, outcome));
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter().map(|(_, outcome)| outcome)
    }
}

impl From<BatchReport> for SyncResponse {
    fn from(value: BatchReport) -> Self {
        Self {
            synced: value.synced,
            duplicates: value.duplicates,
            failed: value.failed,
            results: value
                .results
                .into_iter()
                .map(|(entry, outcome)| SyncEntryResult::new(entry, &outcome))
                .collect(),
        }
    }
}

/// Merges batches of offline clock events into the event store.
///
/// Each event is an independent unit of work: there is no transaction spanning the batch
/// and one failing event never affects its siblings. Events are processed in the order
/// given and the report preserves that order.
pub struct ReconciliationEngine {
    directory: Arc<dyn EntityDirectory>,
    store: Arc<dyn EventStore>,
    audit: Arc<dyn AuditSink>,
    skew_threshold: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        directory: Arc<dyn EntityDirectory>,
        store: Arc<dyn EventStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            directory,
            store,
            audit,
            skew_threshold: DEFAULT_SKEW_THRESHOLD,
        }
    }

    pub fn skew_threshold(mut self, threshold: Duration) -> Self {
        self.skew_threshold = threshold;
        self
    }

    pub async fn submit_batch(&self, entries: Vec<serde_json::Value>) -> BatchReport {
        self.submit_batch_at(entries, OffsetDateTime::now_utc()).await
    }

    /// Same as [`Self::submit_batch`] with an explicit server time.
    pub async fn submit_batch_at(
        &self,
        entries: Vec<serde_json::Value>,
        now: OffsetDateTime,
    ) -> BatchReport {
        debug!("reconciling batch of {} entries", entries.len());
        let mut report = BatchReport::default();

        for entry in entries {
            let outcome = self.reconcile(&entry, now).await;
            report.push(entry, outcome);
        }

        info!(
            synced = report.synced,
            duplicates = report.duplicates,
            failed = report.failed,
            "batch reconciled"
        );
        report
    }

    async fn reconcile(&self, value: &serde_json::Value, now: OffsetDateTime) -> Outcome {
        let event = match ValidEvent::decode(value) {
            Ok(v) => v,
            Err(reason) => return Outcome::Rejected(reason),
        };

        let employee_ref = match self.directory.resolve_employee(&event.employee).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("unknown employee {}", event.employee);
                return Outcome::EntityNotFound(Entity::Employee);
            }
            Err(err) => {
                error!("Failed to resolve employee {err}");
                return Outcome::Rejected(err.to_string());
            }
        };

        let terminal_ref = match &event.terminal {
            Some(code) => match self.directory.resolve_terminal(code).await {
                Ok(Some(id)) => Some(id),
                Ok(None) => {
                    debug!("unknown terminal {code}");
                    return Outcome::EntityNotFound(Entity::Terminal);
                }
                Err(err) => {
                    error!("Failed to resolve terminal {err}");
                    return Outcome::Rejected(err.to_string());
                }
            },
            None => None,
        };

        let clock_in = event.key_time();
        match self
            .store
            .find_by_employee_and_clock_in(employee_ref, clock_in)
            .await
        {
            Ok(Some(existing)) => {
                debug!("duplicate of entry {}", existing.id);
                return Outcome::Duplicate;
            }
            Ok(None) => {}
            Err(err) => {
                error!("Failed duplicate lookup {err}");
                return Outcome::Rejected(err.to_string());
            }
        }

        let mut reasons = vec![];
        if event.clock_in.is_none() {
            reasons.push(CLOCK_OUT_ONLY.to_string());
        }
        if let Some(reason) = self.skew_reason(event.captured_at, now) {
            reasons.push(reason);
        }

        let new_entry = NewEntry {
            employee_ref,
            terminal_ref,
            clock_in,
            clock_out: event.clock_out,
            notes: event.notes,
            source: EventSource::Offline,
            flagged: !reasons.is_empty(),
            flag_reason: (!reasons.is_empty()).then(|| reasons.join("; ")),
            synced_at: Some(now),
        };

        let entry = match self.store.insert(new_entry).await {
            Ok(v) => v,
            // lost the race against a concurrent submission of the same event
            Err(StoreError::Conflict) => return Outcome::Duplicate,
            Err(err) => {
                error!("Failed to commit entry {err}");
                return Outcome::Rejected(err.to_string());
            }
        };

        self.record_audit(&entry, event.captured_at).await;

        Outcome::Success {
            entry_id: entry.id,
            flagged: entry.flagged,
        }
    }

    fn skew_reason(&self, captured_at: OffsetDateTime, now: OffsetDateTime) -> Option<String> {
        let skew = (now - captured_at).abs();
        if skew <= self.skew_threshold {
            return None;
        }

        Some(format!(
            "capture time differs from server time by {:.1} minutes (threshold {} minutes)",
            skew.as_seconds_f64() / 60.0,
            self.skew_threshold.whole_minutes()
        ))
    }

    async fn record_audit(&self, entry: &CanonicalEntry, captured_at: OffsetDateTime) {
        let new_data = match serde_json::to_value(EntryView::from(entry)) {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to serialize audit snapshot {err}");
                serde_json::Value::Null
            }
        };

        let record = AuditRecord {
            employee_ref: entry.employee_ref,
            action: OFFLINE_SYNC_ACTION,
            table_name: "clock_entries",
            record_id: entry.id,
            captured_at: Some(captured_at),
            new_data,
        };

        if let Err(err) = self.audit.append(record).await {
            warn!("Failed to append audit record for entry {}: {err}", entry.id);
        }
    }
}
