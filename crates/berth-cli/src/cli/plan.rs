//! plan subcommand

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use berth_core::{DryRunProvisioner, JsonProvisioner, ProvisionerRouter, build_plan_with_raw};
use berth_observe::{Event, EventKind, log_event};
use clap::Args;

use crate::cli::DeclarationArgs;

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub declaration: DeclarationArgs,

    /// Write the plan document here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Walk the plan in the log without writing a document
    #[arg(long, conflicts_with = "out")]
    pub dry_run: bool,
}

/// In-memory sink for the JSON provisioner, drained into the command writer afterwards.
#[derive(Clone, Default)]
struct PlanBuffer(Arc<Mutex<Vec<u8>>>);

impl PlanBuffer {
    fn drain_into(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut buf = self.0.lock().map_err(|_| poisoned())?;
        out.write_all(&buf)?;
        buf.clear();
        out.flush()
    }
}

impl Write for PlanBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| poisoned())?
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::other("plan buffer lock poisoned")
}

impl PlanArgs {
    fn router(&self, buffer: &PlanBuffer) -> anyhow::Result<ProvisionerRouter> {
        let json = match &self.out {
            Some(path) => JsonProvisioner::to_file(path)?,
            None => JsonProvisioner::new(buffer.clone()),
        };

        let mut router = ProvisionerRouter::new();
        router.register(Arc::new(DryRunProvisioner));
        router.register(Arc::new(json));
        Ok(router)
    }

    fn provisioner(&self) -> &'static str {
        if self.dry_run { "dry-run" } else { "json" }
    }
}

pub fn execute(args: &PlanArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let loaded = args.declaration.load()?;
    let plan = build_plan_with_raw(&loaded.declaration, Some(&loaded.raw))?;
    log_event(
        &Event::new(EventKind::PlanBuilt)
            .with_stack(&plan.stack)
            .with_count(plan.units.len()),
    );

    let buffer = PlanBuffer::default();
    let report = args.router(&buffer)?.provision(args.provisioner(), &plan)?;
    log_event(
        &Event::new(EventKind::PlanProvisioned)
            .with_stack(&plan.stack)
            .with_reason(report.provisioner),
    );

    match &args.out {
        Some(path) => writeln!(
            out,
            "plan for {} written to {} ({} units)",
            plan.stack,
            path.display(),
            report.units
        )?,
        None => buffer.drain_into(out)?,
    }
    Ok(())
}
