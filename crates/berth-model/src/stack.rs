use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{CpuUnits, MemoryMib, ModelError, Unit};

/// Complete deployment declaration: one task definition plus the stack around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDeclaration {
    pub stack: StackMeta,
    /// Named inputs referenced as `${name}` from string fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(default)]
    pub network: NetworkSpec,
    #[serde(default)]
    pub storage: StorageSpec,
    pub task: TaskSpec,
    pub service: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<ScalingSpec>,
}

impl StackDeclaration {
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.task.units.iter().find(|u| u.id.as_str() == id)
    }

    pub fn units(&self) -> &[Unit] {
        &self.task.units
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.task.volumes.iter().find(|v| v.name == name)
    }
}

/// Identity of the stack and the account it deploys into.
///
/// `account` and `region` are inputs, never literals baked into unit declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMeta {
    pub name: String,
    pub account: String,
    pub region: String,
    pub cluster_name: String,
}

/// Declared input with a documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub default: String,
    /// Environment variable that overrides the default when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            env: None,
            description: None,
        }
    }

    pub fn with_env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Virtual network the cluster runs in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NetworkSpec {
    /// Create a dedicated network spread over `max_azs` availability zones.
    Provision { max_azs: u8 },
    /// Use the account's default network.
    #[default]
    LookupDefault,
}

/// Shared filesystem backing the task volumes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StorageSpec {
    /// No shared filesystem; volumes may not be declared.
    #[default]
    None,
    /// Provision a filesystem owned by this stack.
    Dedicated {
        /// Move files to infrequent-access storage after this many days.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lifecycle_after_days: Option<u32>,
        #[serde(default)]
        removal: RemovalPolicy,
    },
    /// Mount a filesystem created outside this stack.
    Existing {
        file_system_id: String,
        security_group_id: String,
    },
}

impl StorageSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageSpec::None => "none",
            StorageSpec::Dedicated { .. } => "dedicated",
            StorageSpec::Existing { .. } => "existing",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, StorageSpec::None)
    }
}

/// What happens to provisioned storage when the stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    Destroy,
    #[default]
    Retain,
}

impl FromStr for RemovalPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "destroy" => Ok(RemovalPolicy::Destroy),
            "retain" => Ok(RemovalPolicy::Retain),
            _ => Err(ModelError::InvalidRemovalPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPolicy::Destroy => f.write_str("destroy"),
            RemovalPolicy::Retain => f.write_str("retain"),
        }
    }
}

/// Task definition: co-scheduled units sharing network and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub cpu: CpuUnits,
    pub memory_mib: MemoryMib,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    pub units: Vec<Unit>,
}

/// Named volume backed by the stack storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default = "Volume::default_root")]
    pub root_directory: String,
}

impl Volume {
    fn default_root() -> String {
        "/".to_string()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_directory: Self::default_root(),
        }
    }
}

/// Long-running service keeping copies of the task alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    #[serde(default = "ServiceSpec::default_desired")]
    pub desired_count: u32,
    #[serde(default)]
    pub assign_public_ip: bool,
}

impl ServiceSpec {
    fn default_desired() -> u32 {
        1
    }
}

/// Target-tracking autoscaling on average cpu utilisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingSpec {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_cpu_percent: u8,
}
