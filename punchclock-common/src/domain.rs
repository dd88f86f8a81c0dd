use std::str::FromStr;
use uuid::Uuid;

/// Where a canonical entry came from. Offline entries are the ones committed by the
/// reconciliation engine after being replayed from a terminal queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Online,
    Offline,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Online => "online",
            EventSource::Offline => "offline",
        }
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Unknown event source '{s}'")),
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockAction {
    In,
    Out,
}

impl ClockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockAction::In => "in",
            ClockAction::Out => "out",
        }
    }
}

impl std::fmt::Display for ClockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The directory entity a human identifier failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Employee,
    Terminal,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Employee => "employee",
            Entity::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-event result of reconciling one queued clock event.
///
/// Every variant is terminal from the point of view of the terminal queue: the event is
/// acknowledged and removed. `EntityNotFound` and `Rejected` additionally need a human to
/// correct the event, since resubmitting it unchanged can never succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { entry_id: Uuid, flagged: bool },
    Duplicate,
    EntityNotFound(Entity),
    Rejected(String),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::Duplicate => OutcomeKind::Duplicate,
            Outcome::EntityNotFound(_) => OutcomeKind::EntityNotFound,
            Outcome::Rejected(_) => OutcomeKind::Rejected,
        }
    }

    /// Success and duplicate both mean the effect exists server side.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. } | Outcome::Duplicate)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } | Outcome::Duplicate => None,
            Outcome::EntityNotFound(which) => Some(format!("{which} not found")),
            Outcome::Rejected(reason) => Some(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Duplicate,
    EntityNotFound,
    Rejected,
}
