//! Deployment plan assembly.
//!
//! A plan is the hand-off document for the external provisioner: the validated declaration with
//! units in start order, images resolved to references and the access rules the storage implies.

pub mod access;
pub use access::{EgressRule, Effect, PolicyStatement, TaskRole};

use std::path::PathBuf;

use berth_model::{
    CpuUnits, Dependency, HealthCheck, LogSettings, MemoryMib, MountPoint, NetworkSpec,
    PortMapping, ScalingSpec, ServiceSpec, StackDeclaration, StorageSpec, Unit, UnitEnv, UnitId,
    Volume,
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, instrument, warn};

use crate::{
    error::CoreError,
    graph::{DependencyGraph, Edge},
    validate::validate_with_raw,
};

/// Validated, ordered description of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub stack: String,
    pub account: String,
    pub region: String,
    pub cluster_name: String,
    /// RFC 3339 timestamp of plan creation.
    pub generated_at: String,
    pub network: NetworkSpec,
    pub storage: StorageSpec,
    pub task: PlannedTask,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<EgressRule>,
    /// Units in start order.
    pub units: Vec<PlannedUnit>,
    pub waves: Vec<Vec<UnitId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,
    pub service: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<ScalingSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DeploymentPlan {
    pub fn unit(&self, id: &str) -> Option<&PlannedUnit> {
        self.units.iter().find(|u| u.id.as_str() == id)
    }

    /// Unit ids in start order.
    pub fn start_order(&self) -> impl Iterator<Item = &UnitId> {
        self.units.iter().map(|u| &u.id)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub cpu: CpuUnits,
    pub memory_mib: MemoryMib,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TaskRole>,
}

/// One unit as the provisioner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedUnit {
    /// Zero-based position in the start order.
    pub position: usize,
    pub wave: usize,
    pub id: UnitId,
    /// Resolved image reference.
    pub image: String,
    #[serde(default, skip_serializing_if = "UnitEnv::is_empty")]
    pub env: UnitEnv,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
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

impl PlannedUnit {
    fn from_unit(unit: &Unit, position: usize, wave: usize) -> Self {
        Self {
            position,
            wave,
            id: unit.id.clone(),
            image: unit.image.reference(),
            env: unit.env.clone(),
            health_check: unit.health_check.clone(),
            command: unit.command.clone(),
            working_directory: unit.working_directory.clone(),
            essential: unit.essential,
            depends_on: unit.depends_on.clone(),
            ports: unit.ports.clone(),
            mounts: unit.mounts.clone(),
            logging: unit.logging.clone(),
        }
    }
}

/// Validate `decl` and assemble its plan.
///
/// Fails with [`CoreError::Invalid`] carrying every configuration error; nothing is produced for an invalid declaration.
pub fn build_plan(decl: &StackDeclaration) -> Result<DeploymentPlan, CoreError> {
    build_plan_with_raw(decl, None)
}

/// [`build_plan`] for an interpolated declaration whose pre-interpolation form is known.
#[instrument(level = "info", skip_all, fields(stack = %decl.stack.name))]
pub fn build_plan_with_raw(
    decl: &StackDeclaration,
    raw: Option<&StackDeclaration>,
) -> Result<DeploymentPlan, CoreError> {
    let warnings = validate_with_raw(decl, raw).into_result()?;
    for w in &warnings {
        warn!(warning = %w, "declaration warning");
    }

    let graph = DependencyGraph::from_units(decl.units())
        .map_err(|e| CoreError::Invalid(single(e.into())))?;
    let order = graph
        .resolve()
        .map_err(|e| CoreError::Invalid(single(e.into())))?;
    let waves = graph
        .waves()
        .map_err(|e| CoreError::Invalid(single(e.into())))?;

    let wave_of = |id: &UnitId| waves.iter().position(|w| w.contains(id)).unwrap_or(0);
    let units = order
        .iter()
        .enumerate()
        .filter_map(|(pos, id)| {
            decl.unit(id.as_str())
                .map(|u| PlannedUnit::from_unit(u, pos, wave_of(id)))
        })
        .collect::<Vec<_>>();

    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| CoreError::Encode(e.to_string()))?;

    let plan = DeploymentPlan {
        stack: decl.stack.name.clone(),
        account: decl.stack.account.clone(),
        region: decl.stack.region.clone(),
        cluster_name: decl.stack.cluster_name.clone(),
        generated_at,
        network: decl.network.clone(),
        storage: decl.storage.clone(),
        task: PlannedTask {
            cpu: decl.task.cpu,
            memory_mib: decl.task.memory_mib,
            volumes: decl.task.volumes.clone(),
            role: access::task_role(&decl.stack, &decl.storage),
        },
        egress: access::egress_rules(&decl.storage),
        units,
        waves,
        edges: graph.edges().collect(),
        service: decl.service.clone(),
        scaling: decl.scaling,
        warnings: warnings.iter().map(ToString::to_string).collect(),
    };

    info!(
        units = plan.units.len(),
        waves = plan.waves.len(),
        storage = plan.storage.kind(),
        "deployment plan assembled"
    );
    Ok(plan)
}

fn single(e: crate::error::DeclarationError) -> crate::validate::ValidationReport {
    crate::validate::ValidationReport {
        errors: vec![e],
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{RegistryVariant, StackTemplate, StorageVariant};
    use berth_model::DependencyCondition;

    fn template_decl() -> StackDeclaration {
        let decl = StackTemplate::new(StorageVariant::Existing, RegistryVariant::Private).render();
        crate::params::apply_defaults(&decl).unwrap()
    }

    #[test]
    fn plan_orders_application_last() {
        let plan = build_plan(&template_decl()).unwrap();

        let order: Vec<_> = plan.start_order().map(UnitId::as_str).collect();
        assert_eq!(order, vec!["mariadb", "redis", "frappe"]);
        assert_eq!(plan.waves.len(), 2);
        assert_eq!(plan.unit("frappe").map(|u| u.wave), Some(1));
        assert_eq!(plan.unit("frappe").map(|u| u.position), Some(2));
        assert_eq!(plan.edges.len(), 2);
        assert!(plan.edges.iter().all(|e| e.condition == DependencyCondition::Healthy));
    }

    #[test]
    fn plan_resolves_private_images() {
        let plan = build_plan(&template_decl()).unwrap();
        assert_eq!(
            plan.unit("redis").map(|u| u.image.as_str()),
            Some("earnipay/dashboard:redis-staging-latest")
        );
    }

    #[test]
    fn plan_derives_storage_access() {
        let plan = build_plan(&template_decl()).unwrap();
        let role = plan.task.role.as_ref().unwrap();
        assert!(role.statements[0].resources[0].contains(":file-system/"));
        assert_eq!(plan.egress[0].port, access::NFS_PORT);
    }

    fn credential_warnings(plan: &DeploymentPlan) -> usize {
        plan.warnings
            .iter()
            .filter(|w| w.contains("MYSQL_ROOT_PASSWORD"))
            .count()
    }

    #[test]
    fn literal_credential_is_flagged() {
        let mut raw = StackTemplate::new(StorageVariant::Existing, RegistryVariant::Private).render();
        raw.task.units[0] = raw.task.units[0]
            .clone()
            .with_env("MYSQL_ROOT_PASSWORD", "hunter2");
        let decl = crate::params::apply_defaults(&raw).unwrap();

        let plan = build_plan_with_raw(&decl, Some(&raw)).unwrap();
        assert_eq!(credential_warnings(&plan), 1);
    }

    #[test]
    fn parameterised_credential_is_not_flagged() {
        let raw = StackTemplate::new(StorageVariant::Existing, RegistryVariant::Private).render();
        let plan = build_plan_with_raw(&template_decl(), Some(&raw)).unwrap();

        assert_eq!(credential_warnings(&plan), 0);
        assert!(plan.warnings.iter().any(|w| w.contains("is mutable")));
    }

    #[test]
    fn invalid_declaration_produces_no_plan() {
        let mut decl = template_decl();
        decl.task.units[0] = decl.task.units[0]
            .clone()
            .depends_on("frappe", DependencyCondition::Started);

        let err = build_plan(&decl).unwrap_err();
        let CoreError::Invalid(report) = err else {
            panic!("expected invalid declaration");
        };
        assert!(report.to_string().contains("dependency cycle"));
    }

    #[test]
    fn plan_json_has_stable_shape() {
        let plan = build_plan(&template_decl()).unwrap();
        let json = plan.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["units"][2]["id"], "frappe");
        assert_eq!(value["storage"]["mode"], "existing");
        assert_eq!(value["task"]["role"]["statements"][0]["effect"], "Allow");
    }
}
