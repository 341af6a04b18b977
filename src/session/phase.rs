//! Session lifecycle phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a session is in its lifecycle.
///
/// `Collecting → ReadyForHandoff → Completed`, with `Urgent` reachable from
/// either non-terminal phase. Urgent has no exit short of a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Collecting,
    Urgent,
    ReadyForHandoff,
    Completed,
}

impl SessionPhase {
    /// Whether moving to `target` is a legal transition. Staying in a
    /// non-terminal phase counts as legal.
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;

        matches!(
            (*self, target),
            (Collecting, Collecting)
                | (Collecting, Urgent)
                | (Collecting, ReadyForHandoff)
                | (ReadyForHandoff, ReadyForHandoff)
                | (ReadyForHandoff, Urgent)
                | (ReadyForHandoff, Completed)
                | (Urgent, Urgent)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collecting => "collecting",
            Self::Urgent => "urgent",
            Self::ReadyForHandoff => "ready_for_handoff",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        assert!(SessionPhase::Collecting.can_transition_to(SessionPhase::ReadyForHandoff));
        assert!(SessionPhase::ReadyForHandoff.can_transition_to(SessionPhase::Completed));
        assert!(SessionPhase::ReadyForHandoff.can_transition_to(SessionPhase::ReadyForHandoff));
    }

    #[test]
    fn urgent_is_sticky() {
        assert!(SessionPhase::Collecting.can_transition_to(SessionPhase::Urgent));
        assert!(SessionPhase::ReadyForHandoff.can_transition_to(SessionPhase::Urgent));
        assert!(SessionPhase::Urgent.can_transition_to(SessionPhase::Urgent));
        assert!(!SessionPhase::Urgent.can_transition_to(SessionPhase::Collecting));
        assert!(!SessionPhase::Urgent.can_transition_to(SessionPhase::ReadyForHandoff));
        assert!(!SessionPhase::Urgent.can_transition_to(SessionPhase::Completed));
    }

    #[test]
    fn completed_is_terminal() {
        assert!(SessionPhase::Completed.is_terminal());
        for target in [
            SessionPhase::Collecting,
            SessionPhase::Urgent,
            SessionPhase::ReadyForHandoff,
            SessionPhase::Completed,
        ] {
            assert!(!SessionPhase::Completed.can_transition_to(target));
        }
        assert!(!SessionPhase::Collecting.can_transition_to(SessionPhase::Completed));
    }

    #[test]
    fn display_matches_serde() {
        let json = serde_json::to_value(SessionPhase::ReadyForHandoff).unwrap();
        assert_eq!(json, SessionPhase::ReadyForHandoff.to_string());
    }
}
