use berth_model::{CpuUnits, DependencyCondition, MemoryMib, UnitId};
use thiserror::Error;

use crate::validate::ValidationReport;

/// Failure to order a unit set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("duplicate unit id: {0}")]
    DuplicateUnit(UnitId),

    #[error("unit '{referenced_by}' depends on undeclared unit '{unit}'")]
    UndeclaredUnit { unit: UnitId, referenced_by: UnitId },

    /// An edge whose dependent side is not a declared unit.
    #[error("edge to '{dependency}' starts from undeclared unit '{unit}'")]
    UndeclaredDependent { unit: UnitId, dependency: UnitId },

    #[error("unit '{unit}' lists dependency '{dependency}' more than once")]
    DuplicateDependency { unit: UnitId, dependency: UnitId },

    /// Units on the cycle, each depending on the next; the last depends on the first.
    #[error("dependency cycle: {}", render_cycle(.0))]
    Cycle(Vec<UnitId>),
}

impl ResolveError {
    /// Units named by this error.
    pub fn units(&self) -> Vec<&UnitId> {
        match self {
            ResolveError::DuplicateUnit(id) => vec![id],
            ResolveError::UndeclaredUnit { unit, referenced_by } => vec![unit, referenced_by],
            ResolveError::UndeclaredDependent { unit, dependency } => vec![unit, dependency],
            ResolveError::DuplicateDependency { unit, dependency } => vec![unit, dependency],
            ResolveError::Cycle(ids) => ids.iter().collect(),
        }
    }
}

fn render_cycle(ids: &[UnitId]) -> String {
    let mut out = ids
        .iter()
        .map(UnitId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ");
    if let Some(first) = ids.first() {
        out.push_str(" -> ");
        out.push_str(first.as_str());
    }
    out
}

/// A single fatal problem found in a declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error(transparent)]
    Graph(#[from] ResolveError),

    #[error("duplicate volume name: {0}")]
    DuplicateVolume(String),

    #[error("volumes are declared but stack storage is 'none'")]
    VolumesWithoutStorage,

    #[error("unit '{unit}' mounts undeclared volume '{volume}'")]
    UndeclaredVolume { unit: UnitId, volume: String },

    #[error("container port {port} is mapped by both '{first}' and '{second}'")]
    DuplicatePort {
        port: u16,
        first: UnitId,
        second: UnitId,
    },

    #[error("unit '{unit}' waits for '{dependency}' to be HEALTHY but '{dependency}' has no health check")]
    HealthCheckRequired { unit: UnitId, dependency: UnitId },

    #[error("unit '{unit}' waits for essential unit '{dependency}' with condition {condition}; an essential unit cannot be expected to exit")]
    ExitConditionOnEssential {
        unit: UnitId,
        dependency: UnitId,
        condition: DependencyCondition,
    },

    #[error("task has no essential unit")]
    NoEssentialUnit,

    #[error("unit '{unit}': health check {field} = {value} is outside {min}..={max}")]
    HealthCheckOutOfRange {
        unit: UnitId,
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("unit '{unit}': health check timeout ({timeout}s) must be shorter than interval ({interval}s)")]
    HealthCheckTimeout {
        unit: UnitId,
        timeout: u32,
        interval: u32,
    },

    #[error("unsupported cpu/memory pairing: cpu={cpu} memory={memory_mib}MiB")]
    UnsupportedTaskSize { cpu: CpuUnits, memory_mib: MemoryMib },

    #[error("invalid scaling: {0}")]
    InvalidScaling(String),

    #[error("invalid account id '{0}' (expected 12 digits)")]
    InvalidAccount(String),
}

impl DeclarationError {
    pub fn missing(field: impl Into<String>) -> Self {
        DeclarationError::MissingField {
            field: field.into(),
        }
    }
}

/// Failure to substitute `${name}` parameter references.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("reference to undeclared parameter '{name}' in '{input}'")]
    Undeclared { name: String, input: String },

    #[error("value given for undeclared parameter '{0}'")]
    UnknownOverride(String),

    #[error("unterminated parameter reference in '{0}'")]
    Unterminated(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("declaration is invalid:\n{0}")]
    Invalid(ValidationReport),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("no provisioner registered under '{0}'")]
    NoProvisioner(String),

    #[error("provisioner '{provisioner}' failed: {reason}")]
    Provision { provisioner: String, reason: String },

    #[error("failed to encode plan: {0}")]
    Encode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Encode(e.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(e: toml::ser::Error) -> Self {
        CoreError::Encode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_closes_the_loop() {
        let err = ResolveError::Cycle(vec![UnitId::from("a"), UnitId::from("b")]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn undeclared_message_names_both_units() {
        let err = ResolveError::UndeclaredUnit {
            unit: UnitId::from("d"),
            referenced_by: UnitId::from("c"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'d'"));
        assert!(msg.contains("'c'"));
        assert_eq!(err.units().len(), 2);
    }

    #[test]
    fn undeclared_dependent_names_the_dependent_first() {
        let err = ResolveError::UndeclaredDependent {
            unit: UnitId::from("z"),
            dependency: UnitId::from("a"),
        };
        assert_eq!(err.to_string(), "edge to 'a' starts from undeclared unit 'z'");
        assert_eq!(err.units()[0].as_str(), "z");
    }
}
