//! # Scan State Machine
//!
//! Tracks one scan through the reconciliation pipeline with validated
//! transitions.
//!
//! ```text
//! Idle → SelectingScope → Filtering → Classifying → Aggregating
//!                                                       │
//!                        ┌── DetectingRemovals ◄────────┤ (full scope)
//!                        ▼                              │
//!                     Planned ◄─────────────────────────┘ (other scopes)
//!                        │
//!                        ▼
//!                     Applied
//!
//! Any non-terminal state → Failed
//! ```

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Create a new random scan ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    SelectingScope,
    Filtering,
    Classifying,
    Aggregating,
    DetectingRemovals,
    Planned,
    Applied,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Applied | ScanState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "Idle",
            ScanState::SelectingScope => "SelectingScope",
            ScanState::Filtering => "Filtering",
            ScanState::Classifying => "Classifying",
            ScanState::Aggregating => "Aggregating",
            ScanState::DetectingRemovals => "DetectingRemovals",
            ScanState::Planned => "Planned",
            ScanState::Applied => "Applied",
            ScanState::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of one scan plus the scope rule that gates removal detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStateMachine {
    state: ScanState,
    allows_removals: bool,
}

impl ScanStateMachine {
    pub fn new(allows_removals: bool) -> Self {
        Self {
            state: ScanState::Idle,
            allows_removals,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Move to `to`, rejecting transitions the pipeline does not allow.
    pub fn transition(&mut self, to: ScanState) -> Result<()> {
        self.validate_transition(to)?;
        self.state = to;
        Ok(())
    }

    /// Move to `Failed` from wherever the scan stopped. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ScanState::Failed;
        }
    }

    fn validate_transition(&self, to: ScanState) -> Result<()> {
        use ScanState::*;

        let valid = match (self.state, to) {
            (Idle, SelectingScope) => true,
            (SelectingScope, Filtering) => true,
            (Filtering, Classifying) => true,
            (Classifying, Aggregating) => true,

            // Removal detection is bound to the full scope
            (Aggregating, DetectingRemovals) => self.allows_removals,
            (Aggregating, Planned) => !self.allows_removals,
            (DetectingRemovals, Planned) => true,

            (Planned, Applied) => true,

            (Applied, _) | (Failed, _) => false,
            (_, Failed) => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
                reason: format!("Cannot transition from {} to {}", self.state, to),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(machine: &mut ScanStateMachine, states: &[ScanState]) {
        for state in states {
            machine.transition(*state).unwrap();
        }
    }

    #[test]
    fn test_full_scope_path() {
        let mut machine = ScanStateMachine::new(true);
        advance(
            &mut machine,
            &[
                ScanState::SelectingScope,
                ScanState::Filtering,
                ScanState::Classifying,
                ScanState::Aggregating,
                ScanState::DetectingRemovals,
                ScanState::Planned,
                ScanState::Applied,
            ],
        );
        assert_eq!(machine.state(), ScanState::Applied);
    }

    #[test]
    fn test_partial_scope_skips_removal_detection() {
        let mut machine = ScanStateMachine::new(false);
        advance(
            &mut machine,
            &[
                ScanState::SelectingScope,
                ScanState::Filtering,
                ScanState::Classifying,
                ScanState::Aggregating,
            ],
        );

        let result = machine.transition(ScanState::DetectingRemovals);
        assert!(matches!(result, Err(SyncError::InvalidStateTransition { .. })));

        machine.transition(ScanState::Planned).unwrap();
    }

    #[test]
    fn test_full_scope_cannot_skip_removal_detection() {
        let mut machine = ScanStateMachine::new(true);
        advance(
            &mut machine,
            &[
                ScanState::SelectingScope,
                ScanState::Filtering,
                ScanState::Classifying,
                ScanState::Aggregating,
            ],
        );
        assert!(machine.transition(ScanState::Planned).is_err());
    }

    #[test]
    fn test_stages_cannot_be_skipped() {
        let mut machine = ScanStateMachine::new(true);
        assert!(machine.transition(ScanState::Classifying).is_err());
        assert_eq!(machine.state(), ScanState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        let mut machine = ScanStateMachine::new(false);
        machine.transition(ScanState::SelectingScope).unwrap();
        machine.fail();
        assert_eq!(machine.state(), ScanState::Failed);
        assert!(machine.transition(ScanState::Filtering).is_err());

        machine.fail();
        assert_eq!(machine.state(), ScanState::Failed);
    }

    #[test]
    fn test_scan_id_unique() {
        assert_ne!(ScanId::new(), ScanId::new());
    }
}
