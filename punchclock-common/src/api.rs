use crate::domain::{ClockAction, Entity, EventSource, Outcome, OutcomeKind};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}

/// A clock event captured on a terminal. It only carries the human facing codes because a
/// terminal that is offline never learns the canonical references.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvent {
    pub human_employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_terminal_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub clock_in: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub clock_out: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

impl PendingEvent {
    pub fn clock_in(employee: &str, at: OffsetDateTime) -> Self {
        Self {
            human_employee_id: employee.into(),
            human_terminal_id: None,
            clock_in: Some(at),
            clock_out: None,
            notes: None,
            captured_at: at,
        }
    }

    pub fn clock_out(employee: &str, at: OffsetDateTime) -> Self {
        Self {
            clock_in: None,
            clock_out: Some(at),
            ..Self::clock_in(employee, at)
        }
    }

    pub fn terminal(mut self, terminal: Option<String>) -> Self {
        self.human_terminal_id = terminal;
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn captured_at(mut self, captured_at: OffsetDateTime) -> Self {
        self.captured_at = captured_at;
        self
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SyncRequest {
    pub entries: Vec<PendingEvent>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SyncResponse {
    pub synced: usize,
    #[serde(default)]
    pub duplicates: usize,
    pub failed: usize,
    pub results: Vec<SyncEntryResult>,
}

/// One element of the `results` array. `entry` echoes the submitted json as it was received.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntryResult {
    pub entry: serde_json::Value,
    pub success: bool,
    pub outcome: OutcomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
}

impl SyncEntryResult {
    pub fn new(entry: serde_json::Value, outcome: &Outcome) -> Self {
        let (entry_id, flagged) = match outcome {
            Outcome::Success { entry_id, flagged } => (Some(*entry_id), Some(*flagged)),
            _ => (None, None),
        };
        let entity = match outcome {
            Outcome::EntityNotFound(which) => Some(*which),
            _ => None,
        };

        Self {
            entry,
            success: outcome.is_success(),
            outcome: outcome.kind(),
            entry_id,
            entity,
            error: outcome.error_message(),
            flagged,
        }
    }

    /// Rebuild the typed outcome from the wire shape.
    pub fn outcome(&self) -> Result<Outcome, String> {
        match self.outcome {
            OutcomeKind::Success => {
                let entry_id = self
                    .entry_id
                    .ok_or_else(|| "success result without entryId".to_string())?;
                Ok(Outcome::Success {
                    entry_id,
                    flagged: self.flagged.unwrap_or(false),
                })
            }
            OutcomeKind::Duplicate => Ok(Outcome::Duplicate),
            OutcomeKind::EntityNotFound => self
                .entity
                .map(Outcome::EntityNotFound)
                .ok_or_else(|| "entity_not_found result without entity".to_string()),
            OutcomeKind::Rejected => Ok(Outcome::Rejected(
                self.error.clone().unwrap_or_else(|| "rejected".into()),
            )),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockRequest {
    pub human_employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_terminal_id: Option<String>,
    pub action: ClockAction,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ClockRequest {
    /// The queued form of this request, used when the direct write can not reach the server.
    pub fn to_pending(&self) -> PendingEvent {
        let event = match self.action {
            ClockAction::In => PendingEvent::clock_in(&self.human_employee_id, self.at),
            ClockAction::Out => PendingEvent::clock_out(&self.human_employee_id, self.at),
        };
        event
            .terminal(self.human_terminal_id.clone())
            .notes(self.notes.clone())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: Uuid,
    pub employee_ref: Uuid,
    pub terminal_ref: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub clock_out: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub source: EventSource,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub synced_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: Uuid,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalView {
    pub id: Uuid,
    pub terminal_id: String,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct EntriesQuery {
    pub employee: Option<String>,
    pub flagged: Option<bool>,
    pub limit: Option<u32>,
}
