use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Payment lifecycle status.
///
/// Transitions are monotonic: `Pending → Reserved → Completed | Failed`,
/// with `Failed` also reachable directly from `Pending` when the fund
/// reservation itself fails. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RESERVED")]
    Reserved,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Status {
    /// Returns true if no further transition can leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    /// Returns true if the state machine permits moving to `next`.
    pub fn can_transition_to(&self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::Reserved)
                | (Status::Pending, Status::Failed)
                | (Status::Reserved, Status::Completed)
                | (Status::Reserved, Status::Failed)
        )
    }

    /// Validates a transition, returning the target status on success.
    pub fn transition_to(&self, next: Status) -> Result<Status, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns the wire representation, which doubles as the event type
    /// recorded in the event log for status-change events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Reserved => "RESERVED",
            Status::Completed => "COMPLETED",
            Status::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
