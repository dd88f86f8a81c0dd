use punchclock_common::api::{EmployeeView, EntryView, TerminalView};
use punchclock_common::domain::EventSource;
use time::OffsetDateTime;
use uuid::Uuid;

/// Whether the instant fits the i64 nanosecond columns, roughly years 1677 to 2262.
pub fn storable(value: OffsetDateTime) -> bool {
    i64::try_from(value.unix_timestamp_nanos()).is_ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEntry {
    pub id: Uuid,
    pub employee_ref: Uuid,
    pub terminal_ref: Option<Uuid>,
    pub clock_in: OffsetDateTime,
    pub clock_out: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub source: EventSource,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub synced_at: Option<OffsetDateTime>,
}

impl From<&CanonicalEntry> for EntryView {
    fn from(value: &CanonicalEntry) -> Self {
        Self {
            id: value.id,
            employee_ref: value.employee_ref,
            terminal_ref: value.terminal_ref,
            clock_in: value.clock_in,
            clock_out: value.clock_out,
            notes: value.notes.clone(),
            source: value.source,
            flagged: value.flagged,
            flag_reason: value.flag_reason.clone(),
            synced_at: value.synced_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub employee_ref: Uuid,
    pub terminal_ref: Option<Uuid>,
    pub clock_in: OffsetDateTime,
    pub clock_out: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub source: EventSource,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub synced_at: Option<OffsetDateTime>,
}

impl NewEntry {
    pub fn into_entry(self, id: Uuid) -> CanonicalEntry {
        CanonicalEntry {
            id,
            employee_ref: self.employee_ref,
            terminal_ref: self.terminal_ref,
            clock_in: self.clock_in,
            clock_out: self.clock_out,
            notes: self.notes,
            source: self.source,
            flagged: self.flagged,
            flag_reason: self.flag_reason,
            synced_at: self.synced_at,
        }
    }
}

/// Append-only record of a commit caused by reconciliation.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub employee_ref: Uuid,
    pub action: &'static str,
    pub table_name: &'static str,
    pub record_id: Uuid,
    pub captured_at: Option<OffsetDateTime>,
    pub new_data: serde_json::Value,
}

#[derive(Debug)]
pub struct NewEmployee {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
}

#[derive(Debug)]
pub struct NewTerminal {
    pub terminal_code: String,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
}

impl From<Employee> for EmployeeView {
    fn from(value: Employee) -> Self {
        Self {
            id: value.id,
            employee_id: value.employee_code,
            first_name: value.first_name,
            last_name: value.last_name,
            department: value.department,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    pub id: Uuid,
    pub terminal_code: String,
    pub name: String,
    pub location: Option<String>,
}

impl From<Terminal> for TerminalView {
    fn from(value: Terminal) -> Self {
        Self {
            id: value.id,
            terminal_id: value.terminal_code,
            name: value.name,
            location: value.location,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntryFilter {
    pub employee_code: Option<String>,
    pub flagged: Option<bool>,
    pub limit: Option<u32>,
}
