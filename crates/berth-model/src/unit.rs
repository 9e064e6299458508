use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{DependencyCondition, HealthCheck, ImageSource, ModelError, UnitEnv, UnitId};

/// A single deployable container inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier within the task.
    pub id: UnitId,
    /// Container image.
    pub image: ImageSource,
    /// Environment variables for the container.
    #[serde(default, skip_serializing_if = "UnitEnv::is_empty")]
    pub env: UnitEnv,
    /// Readiness probe; required by any dependent waiting on `HEALTHY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    /// Override of the image's default command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Whether the whole task stops when this unit exits.
    #[serde(default = "default_essential")]
    pub essential: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<MountPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LogSettings>,
}

fn default_essential() -> bool {
    true
}

impl Unit {
    /// Essential unit with the given image and nothing else configured.
    pub fn new(id: impl Into<UnitId>, image: ImageSource) -> Self {
        Self {
            id: id.into(),
            image,
            env: UnitEnv::new(),
            health_check: None,
            command: None,
            working_directory: None,
            essential: true,
            depends_on: Vec::new(),
            ports: Vec::new(),
            mounts: Vec::new(),
            logging: None,
        }
    }

    pub fn with_env<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env.set(key, value);
        self
    }

    pub fn with_health_check(mut self, hc: HealthCheck) -> Self {
        self.health_check = Some(hc);
        self
    }

    pub fn with_command<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(cmd.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_essential(mut self, essential: bool) -> Self {
        self.essential = essential;
        self
    }

    pub fn depends_on(mut self, unit: impl Into<UnitId>, condition: DependencyCondition) -> Self {
        self.depends_on.push(Dependency {
            unit: unit.into(),
            condition,
        });
        self
    }

    pub fn with_port(mut self, container_port: u16) -> Self {
        self.ports.push(PortMapping {
            container_port,
            protocol: Protocol::Tcp,
        });
        self
    }

    pub fn with_mount(mut self, mount: MountPoint) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_logging(mut self, stream_prefix: impl Into<String>) -> Self {
        self.logging = Some(LogSettings::new(stream_prefix));
        self
    }

    /// Identifiers this unit depends on, in declaration order.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &UnitId> {
        self.depends_on.iter().map(|d| &d.unit)
    }
}

/// Edge from a dependent unit to its prerequisite.
///
/// The dependent side is the unit that carries the edge in its `depends_on` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub unit: UnitId,
    #[serde(default)]
    pub condition: DependencyCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl FromStr for Protocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(ModelError::InvalidProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

/// Binding of a task volume into a unit's filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub container_path: PathBuf,
    /// Name of a volume declared on the task.
    pub source_volume: String,
    #[serde(default)]
    pub read_only: bool,
}

impl MountPoint {
    pub fn new(container_path: impl Into<PathBuf>, source_volume: impl Into<String>) -> Self {
        Self {
            container_path: container_path.into(),
            source_volume: source_volume.into(),
            read_only: false,
        }
    }
}

/// Routing of container output to the managed log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub stream_prefix: String,
    #[serde(default = "LogSettings::default_retention")]
    pub retention_days: u32,
}

impl LogSettings {
    fn default_retention() -> u32 {
        7
    }

    pub fn new(stream_prefix: impl Into<String>) -> Self {
        Self {
            stream_prefix: stream_prefix.into(),
            retention_days: Self::default_retention(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_dependency_order() {
        let unit = Unit::new("app", ImageSource::public("app:1"))
            .depends_on("db", DependencyCondition::Healthy)
            .depends_on("cache", DependencyCondition::Started);

        let ids: Vec<_> = unit.dependency_ids().map(UnitId::as_str).collect();
        assert_eq!(ids, vec!["db", "cache"]);
    }

    #[test]
    fn toml_defaults_are_applied() {
        let src = r#"
            id = "frappe"
            command = ["bash", "/workspace/init.sh"]
            image = { source = "public", reference = "frappe/bench:v15" }
            depends_on = [{ unit = "mariadb" }]
            ports = [{ container_port = 8000 }]
            logging = { stream_prefix = "Frappe" }
        "#;
        let unit: Unit = toml::from_str(src).unwrap();

        assert!(unit.essential);
        assert_eq!(unit.depends_on[0].condition, DependencyCondition::Healthy);
        assert_eq!(unit.ports[0].protocol, Protocol::Tcp);
        assert_eq!(unit.logging.as_ref().map(|l| l.retention_days), Some(7));
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let unit = Unit::new("redis", ImageSource::public("redis:7"));
        let json = serde_json::to_string(&unit).unwrap();
        assert!(!json.contains("depends_on"));
        assert!(!json.contains("env"));
        assert!(json.contains("\"essential\":true"));
    }

    #[test]
    fn protocol_parses() {
        assert_eq!("UDP".parse(), Ok(Protocol::Udp));
        assert!("sctp".parse::<Protocol>().is_err());
    }
}
