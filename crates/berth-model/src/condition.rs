use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ModelError, UnitState};

/// Required state of a prerequisite unit before a dependent unit may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DependencyCondition {
    /// The prerequisite container has been started.
    #[serde(alias = "started")]
    Started,
    /// The prerequisite health check passes.
    #[default]
    #[serde(alias = "healthy")]
    Healthy,
    /// The prerequisite exited with code zero.
    #[serde(alias = "success")]
    Success,
    /// The prerequisite exited, whatever the exit code.
    #[serde(alias = "complete")]
    Complete,
}

impl DependencyCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCondition::Started => "STARTED",
            DependencyCondition::Healthy => "HEALTHY",
            DependencyCondition::Success => "SUCCESS",
            DependencyCondition::Complete => "COMPLETE",
        }
    }

    /// Whether a prerequisite in `state` satisfies this condition.
    pub fn is_satisfied_by(&self, state: UnitState) -> bool {
        match self {
            DependencyCondition::Started => state.has_started(),
            DependencyCondition::Healthy => matches!(state, UnitState::Healthy),
            DependencyCondition::Success => state.exited_successfully(),
            DependencyCondition::Complete => state.is_terminal(),
        }
    }

    /// Conditions that wait for the prerequisite to exit.
    pub fn requires_exit(&self) -> bool {
        matches!(self, DependencyCondition::Success | DependencyCondition::Complete)
    }
}

impl FromStr for DependencyCondition {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STARTED" | "START" => Ok(DependencyCondition::Started),
            "HEALTHY" => Ok(DependencyCondition::Healthy),
            "SUCCESS" => Ok(DependencyCondition::Success),
            "COMPLETE" => Ok(DependencyCondition::Complete),
            _ => Err(ModelError::InvalidCondition(s.to_string())),
        }
    }
}

impl fmt::Display for DependencyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
