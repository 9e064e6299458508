use tracing::info;

use crate::{
    error::CoreError,
    plan::DeploymentPlan,
    provision::{ProvisionReport, Provisioner},
};

/// Logs the steps a provisioner would take, in start order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunProvisioner;

impl Provisioner for DryRunProvisioner {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn provision(&self, plan: &DeploymentPlan) -> Result<ProvisionReport, CoreError> {
        info!(
            stack = %plan.stack,
            cluster = %plan.cluster_name,
            region = %plan.region,
            storage = plan.storage.kind(),
            "dry run: would provision stack"
        );

        for unit in &plan.units {
            let waits_for = unit
                .depends_on
                .iter()
                .map(|d| format!("{}:{}", d.unit, d.condition))
                .collect::<Vec<_>>()
                .join(",");
            info!(
                step = unit.position + 1,
                wave = unit.wave,
                unit = %unit.id,
                image = %unit.image,
                essential = unit.essential,
                waits_for = %waits_for,
                "dry run: would start unit"
            );
        }

        if let Some(s) = &plan.scaling {
            info!(
                min = s.min_capacity,
                max = s.max_capacity,
                target_cpu = s.target_cpu_percent,
                "dry run: would attach cpu scaling"
            );
        }

        Ok(ProvisionReport {
            provisioner: self.name(),
            units: plan.units.len(),
        })
    }
}
