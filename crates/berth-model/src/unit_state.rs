use serde::{Deserialize, Serialize};

/// Runtime state of a unit as reported by the orchestrator.
///
/// The orchestrator owns the lifecycle; this type exists so dependency conditions can be evaluated against a snapshot of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitState {
    /// Unit is declared but not yet started.
    Pending,
    /// Container process is up; health not yet confirmed.
    Running,
    /// Health check is passing.
    Healthy,
    /// Container exited.
    Stopped {
        /// Exit code of the container process, if the platform reported one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

impl UnitState {
    /// Returns `true` once the container process has been started at least once.
    pub fn has_started(&self) -> bool {
        !matches!(self, UnitState::Pending)
    }

    /// Returns `true` if the unit exited (won't transition further).
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Stopped { .. })
    }

    /// Returns `true` if the unit exited with code zero.
    pub fn exited_successfully(&self) -> bool {
        matches!(self, UnitState::Stopped { exit_code: Some(0) })
    }
}

impl Default for UnitState {
    fn default() -> Self {
        UnitState::Pending
    }
}
