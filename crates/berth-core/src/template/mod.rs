//! Built-in database/cache/application stack.
//!
//! One parameterised declaration replaces per-variant copies of the whole stack.
//! Variants pick where storage and images come from; every environment-specific value
//! (account, region, tags, pre-existing resource ids) is a parameter with a documented default.

use std::{collections::BTreeMap, fmt, str::FromStr};

use berth_model::{
    DependencyCondition, HealthCheck, ImageSource, MountPoint, NetworkSpec, Parameter,
    RemovalPolicy, ScalingSpec, ServiceSpec, StackDeclaration, StackMeta, StorageSpec, TaskSpec,
    Unit, Volume,
};

use crate::error::CoreError;

const DATA_VOLUME: &str = "mariadb-data";

/// Storage variant of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageVariant {
    /// Mount pre-created shared storage in the account's default network.
    #[default]
    Existing,
    /// Provision storage and a network owned by the stack.
    Dedicated,
}

/// Registry variant of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryVariant {
    /// One private repository, images distinguished by tag.
    #[default]
    Private,
    /// Official public images.
    Public,
}

impl FromStr for StorageVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "existing" => Ok(StorageVariant::Existing),
            "dedicated" => Ok(StorageVariant::Dedicated),
            other => Err(format!("unknown storage variant: {other} (expected: existing|dedicated)")),
        }
    }
}

impl FromStr for RegistryVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(RegistryVariant::Private),
            "public" => Ok(RegistryVariant::Public),
            other => Err(format!("unknown registry variant: {other} (expected: private|public)")),
        }
    }
}

impl fmt::Display for StorageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageVariant::Existing => f.write_str("existing"),
            StorageVariant::Dedicated => f.write_str("dedicated"),
        }
    }
}

impl fmt::Display for RegistryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryVariant::Private => f.write_str("private"),
            RegistryVariant::Public => f.write_str("public"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StackTemplate {
    pub name: String,
    pub storage: StorageVariant,
    pub registry: RegistryVariant,
}

impl StackTemplate {
    pub fn new(storage: StorageVariant, registry: RegistryVariant) -> Self {
        Self {
            name: "earnipay".to_string(),
            storage,
            registry,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declaration with parameter references left in place.
    pub fn render(&self) -> StackDeclaration {
        let (network, storage) = match self.storage {
            StorageVariant::Existing => (
                NetworkSpec::LookupDefault,
                StorageSpec::Existing {
                    file_system_id: "${efs_file_system_id}".into(),
                    security_group_id: "${efs_security_group_id}".into(),
                },
            ),
            StorageVariant::Dedicated => (
                NetworkSpec::Provision { max_azs: 3 },
                StorageSpec::Dedicated {
                    lifecycle_after_days: Some(7),
                    removal: RemovalPolicy::Destroy,
                },
            ),
        };

        StackDeclaration {
            stack: StackMeta {
                name: self.name.clone(),
                account: "${account}".into(),
                region: "${region}".into(),
                cluster_name: format!("{}-cluster", self.name),
            },
            parameters: self.parameters(),
            network,
            storage,
            task: TaskSpec {
                cpu: 1024,
                memory_mib: 2048,
                volumes: vec![Volume::new(DATA_VOLUME)],
                units: self.units(),
            },
            service: ServiceSpec {
                name: format!("{}-service", self.name),
                desired_count: 1,
                assign_public_ip: true,
            },
            scaling: Some(ScalingSpec {
                min_capacity: 1,
                max_capacity: 5,
                target_cpu_percent: 50,
            }),
        }
    }

    /// Rendered declaration as a TOML document.
    pub fn to_toml(&self) -> Result<String, CoreError> {
        Ok(toml::to_string_pretty(&self.render())?)
    }

    fn parameters(&self) -> BTreeMap<String, Parameter> {
        let mut p = BTreeMap::new();
        let mut add = |name: &str, default: &str, env: &str, about: &str| {
            p.insert(
                name.to_string(),
                Parameter::new(default).with_env(env).with_description(about),
            );
        };

        add("account", "000000000000", "BERTH_ACCOUNT", "Target account id");
        add("region", "us-east-1", "BERTH_REGION", "Target region");
        add(
            "mysql_root_password",
            "change-me",
            "MYSQL_ROOT_PASSWORD",
            "Database root password",
        );

        match self.registry {
            RegistryVariant::Private => {
                add(
                    "repository",
                    "earnipay/dashboard",
                    "BERTH_REPOSITORY",
                    "Private repository holding all three images",
                );
                add("frappe_tag", "frappe-staging-latest", "FRAPPE_TAG", "Application image tag");
                add("mariadb_tag", "mariadb-staging-latest", "MARIADB_TAG", "Database image tag");
                add("redis_tag", "redis-staging-latest", "REDIS_TAG", "Cache image tag");
            }
            RegistryVariant::Public => {
                add("frappe_tag", "v15", "FRAPPE_TAG", "Application image tag");
                add("mariadb_tag", "10.6", "MARIADB_TAG", "Database image tag");
                add("redis_tag", "7-alpine", "REDIS_TAG", "Cache image tag");
            }
        }

        if self.storage == StorageVariant::Existing {
            add(
                "efs_file_system_id",
                "fs-00000000",
                "EFS_FILE_SYSTEM_ID",
                "Pre-created shared filesystem",
            );
            add(
                "efs_security_group_id",
                "sg-00000000",
                "EFS_SECURITY_GROUP_ID",
                "Security group guarding the shared filesystem",
            );
        }
        p
    }

    fn image(&self, public_repo: &str, tag_param: &str) -> ImageSource {
        match self.registry {
            RegistryVariant::Private => {
                ImageSource::private("${repository}", format!("${{{tag_param}}}"))
            }
            RegistryVariant::Public => {
                ImageSource::public(format!("docker.io/{public_repo}:${{{tag_param}}}"))
            }
        }
    }

    fn units(&self) -> Vec<Unit> {
        let mariadb = Unit::new("mariadb", self.image("library/mariadb", "mariadb_tag"))
            .with_env("MYSQL_ROOT_PASSWORD", "${mysql_root_password}")
            .with_logging("MariaDB")
            .with_health_check(HealthCheck::shell("mysqladmin ping -h localhost").with_retries(2))
            .with_mount(MountPoint::new("/var/lib/mysql", DATA_VOLUME));

        let redis = Unit::new("redis", self.image("library/redis", "redis_tag"))
            .with_logging("Redis")
            .with_health_check(HealthCheck::shell("redis-cli ping").with_retries(3));

        let frappe = Unit::new("frappe", self.image("frappe/erpnext", "frappe_tag"))
            .with_env("SHELL", "/bin/bash")
            .with_command(["bash", "/workspace/init.sh"])
            .with_working_directory("/home/frappe")
            .with_logging("Frappe")
            .with_port(8000)
            .depends_on("mariadb", DependencyCondition::Healthy)
            .depends_on("redis", DependencyCondition::Healthy);

        vec![mariadb, redis, frappe]
    }
}

impl Default for StackTemplate {
    fn default() -> Self {
        Self::new(StorageVariant::default(), RegistryVariant::default())
    }
}
