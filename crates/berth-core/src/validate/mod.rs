//! Declaration validation.
//!
//! Every check runs and every problem is reported; nothing stops at the first error.
//! Errors block planning. Warnings are surfaced but never fail a declaration.

mod task_size;

use std::{collections::HashMap, fmt};

use berth_model::{HealthCheck, ImageSource, StackDeclaration, StorageSpec, Unit, UnitId};
use tracing::{debug, instrument};

use crate::{
    error::{CoreError, DeclarationError},
    graph::DependencyGraph,
    params::has_reference,
};

/// Env keys containing one of these look like credentials.
const SECRET_MARKERS: &[&str] = &["PASSWORD", "SECRET", "TOKEN", "KEY"];

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub unit: Option<UnitId>,
    pub message: String,
}

impl ValidationWarning {
    fn for_unit(unit: &UnitId, message: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.clone()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(u) => write!(f, "unit '{u}': {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome of validating a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<DeclarationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Warnings on success, the whole report as an error otherwise.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, CoreError> {
        if self.is_ok() {
            Ok(self.warnings)
        } else {
            Err(CoreError::Invalid(self))
        }
    }

    fn error(&mut self, e: impl Into<DeclarationError>) {
        self.errors.push(e.into());
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {e}")?;
        }
        Ok(())
    }
}

/// Run every check against `decl`.
///
/// Without the pre-interpolation declaration every credential-like env value counts as literal;
/// use [`validate_with_raw`] when it is available.
pub fn validate(decl: &StackDeclaration) -> ValidationReport {
    validate_with_raw(decl, None)
}

/// Run every check against the interpolated `decl`, consulting `raw` for how env values were written.
#[instrument(level = "debug", skip_all, fields(stack = %decl.stack.name))]
pub fn validate_with_raw(decl: &StackDeclaration, raw: Option<&StackDeclaration>) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_stack(decl, &mut report);
    check_task(decl, &mut report);
    check_units(decl, &mut report);
    check_secrets(decl, raw, &mut report);
    check_storage(decl, &mut report);
    check_dependencies(decl, &mut report);
    check_scaling(decl, &mut report);

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "declaration validated"
    );
    report
}

fn check_stack(decl: &StackDeclaration, report: &mut ValidationReport) {
    let meta = &decl.stack;
    for (field, value) in [
        ("stack.name", &meta.name),
        ("stack.region", &meta.region),
        ("stack.cluster_name", &meta.cluster_name),
        ("service.name", &decl.service.name),
    ] {
        if value.trim().is_empty() {
            report.error(DeclarationError::missing(field));
        }
    }

    if meta.account.trim().is_empty() {
        report.error(DeclarationError::missing("stack.account"));
    } else if meta.account.len() != 12 || !meta.account.bytes().all(|b| b.is_ascii_digit()) {
        report.error(DeclarationError::InvalidAccount(meta.account.clone()));
    }
}

fn check_task(decl: &StackDeclaration, report: &mut ValidationReport) {
    let task = &decl.task;
    if !task_size::is_supported(task.cpu, task.memory_mib) {
        report.error(DeclarationError::UnsupportedTaskSize {
            cpu: task.cpu,
            memory_mib: task.memory_mib,
        });
    }

    if task.units.is_empty() {
        report.error(DeclarationError::missing("task.units"));
    } else if !task.units.iter().any(|u| u.essential) {
        report.error(DeclarationError::NoEssentialUnit);
    }

    let mut ports: HashMap<u16, &UnitId> = HashMap::new();
    for unit in &task.units {
        for p in &unit.ports {
            if let Some(first) = ports.insert(p.container_port, &unit.id) {
                report.error(DeclarationError::DuplicatePort {
                    port: p.container_port,
                    first: first.clone(),
                    second: unit.id.clone(),
                });
            }
        }
    }
}

fn check_units(decl: &StackDeclaration, report: &mut ValidationReport) {
    for (i, unit) in decl.task.units.iter().enumerate() {
        if unit.id.is_blank() {
            report.error(DeclarationError::missing(format!("task.units[{i}].id")));
        }
        check_image(unit, report);
        if let Some(hc) = &unit.health_check {
            check_health(&unit.id, hc, report);
        }
        if let Some(log) = &unit.logging
            && log.stream_prefix.trim().is_empty()
        {
            report.error(DeclarationError::missing(format!(
                "unit '{}': logging.stream_prefix",
                unit.id
            )));
        }
    }
}

/// Credential-like env values written out literally.
///
/// `raw` is the declaration before interpolation; a value that came from a `${name}` reference
/// there is injected at the boundary and not flagged.
fn check_secrets(decl: &StackDeclaration, raw: Option<&StackDeclaration>, report: &mut ValidationReport) {
    for unit in &decl.task.units {
        let raw_env = raw
            .and_then(|r| r.unit(unit.id.as_str()))
            .map_or(&unit.env, |u| &u.env);

        let literal = unit.env.iter().find(|&(key, value)| {
            is_secret_like(key) && !has_reference(raw_env.get(key).unwrap_or(value))
        });
        if let Some((key, _)) = literal {
            report.warnings.push(ValidationWarning::for_unit(
                &unit.id,
                format!("env '{key}' holds a literal credential; pass it through a parameter instead"),
            ));
        }
    }
}

fn check_image(unit: &Unit, report: &mut ValidationReport) {
    let blank = |field: &str| DeclarationError::missing(format!("unit '{}': {field}", unit.id));
    match &unit.image {
        ImageSource::Private { repository, tag } => {
            if repository.trim().is_empty() {
                report.error(blank("image.repository"));
            }
            if tag.trim().is_empty() {
                report.error(blank("image.tag"));
            }
        }
        ImageSource::Public { reference } => {
            if reference.trim().is_empty() {
                report.error(blank("image.reference"));
            }
        }
    }

    if let Some(tag) = unit.image.tag()
        && (tag == "latest" || tag.ends_with("-latest"))
    {
        report.warnings.push(ValidationWarning::for_unit(
            &unit.id,
            format!("image tag '{tag}' is mutable; redeploys may pick up a different image"),
        ));
    }
}

fn check_health(unit: &UnitId, hc: &HealthCheck, report: &mut ValidationReport) {
    if hc.is_command_empty() {
        report.error(DeclarationError::missing(format!(
            "unit '{unit}': health_check.command"
        )));
    }

    let mut range = |field: &'static str, value: u32, (min, max): (u32, u32)| {
        if !(min..=max).contains(&value) {
            report.error(DeclarationError::HealthCheckOutOfRange {
                unit: unit.clone(),
                field,
                value,
                min,
                max,
            });
        }
    };
    range("retries", hc.retries, HealthCheck::RETRIES_RANGE);
    range("interval_secs", hc.interval_secs, HealthCheck::INTERVAL_RANGE);
    range("timeout_secs", hc.timeout_secs, HealthCheck::TIMEOUT_RANGE);
    if let Some(sp) = hc.start_period_secs {
        range("start_period_secs", sp, (0, HealthCheck::START_PERIOD_MAX));
    }

    if hc.timeout_secs >= hc.interval_secs {
        report.error(DeclarationError::HealthCheckTimeout {
            unit: unit.clone(),
            timeout: hc.timeout_secs,
            interval: hc.interval_secs,
        });
    }
}

fn check_storage(decl: &StackDeclaration, report: &mut ValidationReport) {
    if let StorageSpec::Existing {
        file_system_id,
        security_group_id,
    } = &decl.storage
    {
        if file_system_id.trim().is_empty() {
            report.error(DeclarationError::missing("storage.file_system_id"));
        }
        if security_group_id.trim().is_empty() {
            report.error(DeclarationError::missing("storage.security_group_id"));
        }
    }

    let volumes = &decl.task.volumes;
    if decl.storage.is_none() && !volumes.is_empty() {
        report.error(DeclarationError::VolumesWithoutStorage);
    }
    for (i, v) in volumes.iter().enumerate() {
        if v.name.trim().is_empty() {
            report.error(DeclarationError::missing(format!("task.volumes[{i}].name")));
        } else if volumes[..i].iter().any(|o| o.name == v.name) {
            report.error(DeclarationError::DuplicateVolume(v.name.clone()));
        }
    }

    for unit in &decl.task.units {
        for m in &unit.mounts {
            if decl.volume(&m.source_volume).is_none() {
                report.error(DeclarationError::UndeclaredVolume {
                    unit: unit.id.clone(),
                    volume: m.source_volume.clone(),
                });
            }
        }
    }
}

fn check_dependencies(decl: &StackDeclaration, report: &mut ValidationReport) {
    let units = decl.units();
    for issue in DependencyGraph::check(units) {
        report.error(issue);
    }

    for unit in units {
        for dep in &unit.depends_on {
            let Some(target) = decl.unit(dep.unit.as_str()) else {
                continue;
            };
            if dep.condition == berth_model::DependencyCondition::Healthy
                && target.health_check.is_none()
            {
                report.error(DeclarationError::HealthCheckRequired {
                    unit: unit.id.clone(),
                    dependency: target.id.clone(),
                });
            }
            if dep.condition.requires_exit() && target.essential {
                report.error(DeclarationError::ExitConditionOnEssential {
                    unit: unit.id.clone(),
                    dependency: target.id.clone(),
                    condition: dep.condition,
                });
            }
        }
    }

    for unit in units.iter().filter(|u| !u.essential && u.health_check.is_none()) {
        let depended_on = units
            .iter()
            .any(|o| o.dependency_ids().any(|d| d == &unit.id));
        if !depended_on {
            report.warnings.push(ValidationWarning::for_unit(
                &unit.id,
                "non-essential unit has no health check and nothing depends on it; its failures go unnoticed",
            ));
        }
    }
}

fn check_scaling(decl: &StackDeclaration, report: &mut ValidationReport) {
    let Some(s) = decl.scaling else {
        return;
    };
    let desired = decl.service.desired_count;

    if s.max_capacity == 0 {
        report.error(DeclarationError::InvalidScaling(
            "max_capacity must be at least 1".into(),
        ));
    }
    if s.min_capacity > s.max_capacity {
        report.error(DeclarationError::InvalidScaling(format!(
            "min_capacity ({}) exceeds max_capacity ({})",
            s.min_capacity, s.max_capacity
        )));
    } else if !(s.min_capacity..=s.max_capacity).contains(&desired) {
        report.error(DeclarationError::InvalidScaling(format!(
            "service desired_count ({desired}) is outside {}..={}",
            s.min_capacity, s.max_capacity
        )));
    }
    if !(1..=100).contains(&s.target_cpu_percent) {
        report.error(DeclarationError::InvalidScaling(format!(
            "target_cpu_percent ({}) must be within 1..=100",
            s.target_cpu_percent
        )));
    }
}

fn is_secret_like(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|m| upper.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_model::{
        DependencyCondition, MountPoint, ScalingSpec, ServiceSpec, StackMeta, TaskSpec, Volume,
    };

    fn unit(id: &str) -> Unit {
        Unit::new(id, ImageSource::public(format!("registry.local/{id}:1.0")))
    }

    fn decl(units: Vec<Unit>) -> StackDeclaration {
        StackDeclaration {
            stack: StackMeta {
                name: "demo".into(),
                account: "123456789012".into(),
                region: "us-east-1".into(),
                cluster_name: "demo-cluster".into(),
            },
            parameters: Default::default(),
            network: Default::default(),
            storage: StorageSpec::Existing {
                file_system_id: "fs-1".into(),
                security_group_id: "sg-1".into(),
            },
            task: TaskSpec {
                cpu: 1024,
                memory_mib: 2048,
                volumes: vec![Volume::new("data")],
                units,
            },
            service: ServiceSpec {
                name: "demo-service".into(),
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

    fn sound_units() -> Vec<Unit> {
        vec![
            unit("db")
                .with_health_check(HealthCheck::shell("mysqladmin ping -h localhost").with_retries(2))
                .with_mount(MountPoint::new("/var/lib/mysql", "data")),
            unit("cache").with_health_check(HealthCheck::shell("redis-cli ping")),
            unit("app")
                .with_port(8000)
                .depends_on("db", DependencyCondition::Healthy)
                .depends_on("cache", DependencyCondition::Healthy),
        ]
    }

    #[test]
    fn sound_declaration_passes() {
        let report = validate(&decl(sound_units()));
        assert!(report.is_ok(), "unexpected errors:\n{report}");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn undeclared_dependency_is_named() {
        let mut units = sound_units();
        units[2] = units[2].clone().depends_on("d", DependencyCondition::Started);
        let report = validate(&decl(units));

        assert_eq!(report.errors.len(), 1);
        let msg = report.errors[0].to_string();
        assert!(msg.contains("'d'"), "{msg}");
    }

    #[test]
    fn cycle_is_reported_with_participants() {
        let units = vec![
            unit("a").with_health_check(HealthCheck::shell("true")).depends_on("b", DependencyCondition::Healthy),
            unit("b").with_health_check(HealthCheck::shell("true")).depends_on("a", DependencyCondition::Healthy),
        ];
        let report = validate(&decl(units));
        assert!(report.errors.iter().any(|e| matches!(
            e,
            DeclarationError::Graph(crate::ResolveError::Cycle(ids)) if ids.len() == 2
        )));
    }

    #[test]
    fn healthy_condition_needs_health_check() {
        let mut units = sound_units();
        units[1].health_check = None;
        let report = validate(&decl(units));
        assert_eq!(
            report.errors,
            vec![DeclarationError::HealthCheckRequired {
                unit: UnitId::from("app"),
                dependency: UnitId::from("cache"),
            }]
        );
    }

    #[test]
    fn exit_conditions_reject_essential_prerequisite() {
        let units = vec![
            unit("migrate"),
            unit("app").depends_on("migrate", DependencyCondition::Success),
        ];
        let report = validate(&decl(units));
        assert!(report.errors.iter().any(|e| matches!(e, DeclarationError::ExitConditionOnEssential { .. })));

        let units = vec![
            unit("migrate").with_essential(false),
            unit("app").depends_on("migrate", DependencyCondition::Success),
        ];
        assert!(validate(&decl(units)).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut d = decl(vec![
            unit("app").with_essential(false).with_mount(MountPoint::new("/data", "missing")),
        ]);
        d.stack.account = "8160".into();
        d.task.memory_mib = 1024;
        d.service.desired_count = 9;

        let report = validate(&d);
        assert!(report.errors.contains(&DeclarationError::InvalidAccount("8160".into())));
        assert!(report.errors.contains(&DeclarationError::NoEssentialUnit));
        assert!(report.errors.iter().any(|e| matches!(e, DeclarationError::UnsupportedTaskSize { .. })));
        assert!(report.errors.iter().any(|e| matches!(e, DeclarationError::UndeclaredVolume { .. })));
        assert!(report.errors.iter().any(|e| matches!(e, DeclarationError::InvalidScaling(_))));
        assert_eq!(report.errors.len(), 5);
    }

    #[test]
    fn health_check_bounds() {
        let hc = HealthCheck::shell("true").with_retries(0).with_interval(10).with_timeout(10);
        let report = validate(&decl(vec![unit("a").with_health_check(hc)]));
        assert!(report.errors.iter().any(|e| matches!(
            e,
            DeclarationError::HealthCheckOutOfRange { field: "retries", .. }
        )));
        assert!(report.errors.iter().any(|e| matches!(e, DeclarationError::HealthCheckTimeout { .. })));
    }

    #[test]
    fn volumes_require_storage() {
        let mut d = decl(vec![unit("a")]);
        d.storage = StorageSpec::None;
        d.task.volumes.push(Volume::new("data"));

        let report = validate(&d);
        assert!(report.errors.contains(&DeclarationError::VolumesWithoutStorage));
        assert!(report.errors.contains(&DeclarationError::DuplicateVolume("data".into())));
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let report = validate(&decl(vec![unit("a").with_port(80), unit("b").with_port(80)]));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].to_string().contains("port 80"));
    }

    #[test]
    fn warnings_do_not_fail_validation() {
        let units = vec![
            Unit::new("db", ImageSource::private("earnipay/dashboard", "mariadb-staging-latest"))
                .with_env("MYSQL_ROOT_PASSWORD", "123"),
            unit("sidecar").with_essential(false),
        ];
        let report = validate(&decl(units));
        assert!(report.is_ok(), "{report}");
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings.iter().all(|w| w.unit.is_some()));
        assert!(report.clone().into_result().is_ok());
    }

    fn out_of_range_fields(report: &ValidationReport) -> Vec<&'static str> {
        report
            .errors
            .iter()
            .filter_map(|e| match e {
                DeclarationError::HealthCheckOutOfRange { field, .. } => Some(*field),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn blank_private_image_fields_are_missing() {
        let units = vec![Unit::new("db", ImageSource::private(" ", ""))];
        let report = validate(&decl(units));
        assert_eq!(
            report.errors,
            vec![
                DeclarationError::missing("unit 'db': image.repository"),
                DeclarationError::missing("unit 'db': image.tag"),
            ]
        );
    }

    #[test]
    fn blank_public_reference_is_missing() {
        let report = validate(&decl(vec![Unit::new("web", ImageSource::public(""))]));
        assert_eq!(
            report.errors,
            vec![DeclarationError::missing("unit 'web': image.reference")]
        );
    }

    #[test]
    fn blank_health_check_command_is_missing() {
        let mut hc = HealthCheck::shell("true");
        hc.command = Vec::new();
        let report = validate(&decl(vec![unit("a").with_health_check(hc)]));
        assert_eq!(
            report.errors,
            vec![DeclarationError::missing("unit 'a': health_check.command")]
        );
    }

    #[test]
    fn interval_out_of_range() {
        let hc = HealthCheck::shell("true").with_interval(400);
        let report = validate(&decl(vec![unit("a").with_health_check(hc)]));
        assert_eq!(out_of_range_fields(&report), vec!["interval_secs"]);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn timeout_out_of_range() {
        let hc = HealthCheck::shell("true").with_timeout(1);
        let report = validate(&decl(vec![unit("a").with_health_check(hc)]));
        assert_eq!(out_of_range_fields(&report), vec!["timeout_secs"]);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn start_period_out_of_range() {
        let ok = HealthCheck::shell("true").with_start_period(300);
        assert!(validate(&decl(vec![unit("a").with_health_check(ok)])).is_ok());

        let hc = HealthCheck::shell("true").with_start_period(301);
        let report = validate(&decl(vec![unit("a").with_health_check(hc)]));
        assert_eq!(out_of_range_fields(&report), vec!["start_period_secs"]);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn literal_credential_warns_but_reference_does_not() {
        let raw_unit = |value: &str| {
            unit("db")
                .with_health_check(HealthCheck::shell("true"))
                .with_env("DB_PASSWORD", value)
        };
        let interpolated = decl(vec![raw_unit("s3cret")]);

        let literal = decl(vec![raw_unit("s3cret")]);
        let report = validate_with_raw(&interpolated, Some(&literal));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("DB_PASSWORD"));

        let referenced = decl(vec![raw_unit("${db_password}")]);
        let report = validate_with_raw(&interpolated, Some(&referenced));
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        assert_eq!(validate(&interpolated).warnings.len(), 1);
    }

    #[test]
    fn report_display_lists_each_error() {
        let report = validate(&decl(Vec::new()));
        assert!(!report.is_ok());
        assert_eq!(report.to_string(), "  - missing required field: task.units");
        assert!(matches!(report.into_result(), Err(CoreError::Invalid(_))));
    }
}
