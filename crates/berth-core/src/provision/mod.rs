//! Hand-off of a finished plan to whatever performs the provisioning.
//!
//! Real cloud provisioning happens outside this workspace. What ships here writes the plan
//! document out ([`JsonProvisioner`]) or walks it step by step in the log ([`DryRunProvisioner`]).

mod dry_run;
pub use dry_run::DryRunProvisioner;

mod json;
pub use json::JsonProvisioner;

use std::sync::Arc;

use tracing::{instrument, trace};

use crate::{error::CoreError, plan::DeploymentPlan};

/// What a provisioner did with a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub provisioner: &'static str,
    /// Units handed over, in start order.
    pub units: usize,
}

pub trait Provisioner: Send + Sync {
    /// Registry name (e.g. `"json"`, `"dry-run"`).
    fn name(&self) -> &'static str;

    fn provision(&self, plan: &DeploymentPlan) -> Result<ProvisionReport, CoreError>;
}

/// Named set of provisioners; the caller picks one per run.
#[derive(Default)]
pub struct ProvisionerRouter {
    provisioners: Vec<Arc<dyn Provisioner>>,
}

impl ProvisionerRouter {
    #[inline]
    pub fn new() -> Self {
        Self {
            provisioners: Vec::new(),
        }
    }

    /// Register a provisioner. When two share a name, the first registered wins.
    #[inline]
    pub fn register(&mut self, provisioner: Arc<dyn Provisioner>) {
        self.provisioners.push(provisioner);
    }

    pub fn pick(&self, name: &str) -> Option<&Arc<dyn Provisioner>> {
        self.provisioners.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.provisioners.iter().map(|p| p.name()).collect()
    }

    #[instrument(level = "debug", skip(self, plan), fields(stack = %plan.stack))]
    pub fn provision(&self, name: &str, plan: &DeploymentPlan) -> Result<ProvisionReport, CoreError> {
        let p = self
            .pick(name)
            .ok_or_else(|| CoreError::NoProvisioner(name.to_string()))?;

        let report = p.provision(plan)?;
        trace!(provisioner = p.name(), units = report.units, "plan handed over");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        params::apply_defaults,
        plan::build_plan,
        template::StackTemplate,
    };
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Provisioner for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn provision(&self, plan: &DeploymentPlan) -> Result<ProvisionReport, CoreError> {
            let mut seen = self.seen.lock().unwrap();
            seen.extend(plan.start_order().map(|id| id.to_string()));
            Ok(ProvisionReport {
                provisioner: self.name(),
                units: plan.units.len(),
            })
        }
    }

    fn plan() -> DeploymentPlan {
        let decl = apply_defaults(&StackTemplate::default().render()).unwrap();
        build_plan(&decl).unwrap()
    }

    #[test]
    fn router_dispatches_by_name() {
        let rec = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let mut router = ProvisionerRouter::new();
        router.register(Arc::new(DryRunProvisioner));
        router.register(rec.clone());

        assert_eq!(router.names(), vec!["dry-run", "recording"]);

        let report = router.provision("recording", &plan()).unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(*rec.seen.lock().unwrap(), vec!["mariadb", "redis", "frappe"]);
    }

    #[test]
    fn unknown_provisioner_is_an_error() {
        let router = ProvisionerRouter::new();
        let err = router.provision("cloud", &plan()).unwrap_err();
        assert!(matches!(err, CoreError::NoProvisioner(name) if name == "cloud"));
    }
}
