//! validate subcommand

use std::io::Write;

use berth_core::{CoreError, validate_with_raw};
use berth_observe::{Event, EventKind, log_event};
use clap::Args;

use crate::cli::{DeclarationArgs, log_warnings};

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub declaration: DeclarationArgs,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: &ValidateArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let loaded = args.declaration.load()?;
    let stack = loaded.declaration.stack.name.as_str();
    let report = validate_with_raw(&loaded.declaration, Some(&loaded.raw));

    log_warnings(&report.warnings);
    for w in &report.warnings {
        writeln!(out, "warning: {w}")?;
    }

    if !report.is_ok() {
        log_event(
            &Event::new(EventKind::ValidationFailed)
                .with_stack(stack)
                .with_count(report.errors.len()),
        );
        return Err(CoreError::Invalid(report).into());
    }
    if args.strict && !report.warnings.is_empty() {
        anyhow::bail!(
            "{} warning(s) in strict mode for stack {stack}",
            report.warnings.len()
        );
    }

    log_event(
        &Event::new(EventKind::ValidationPassed)
            .with_stack(stack)
            .with_count(report.warnings.len()),
    );
    writeln!(
        out,
        "{}: stack {stack} is valid ({} units, {} warnings)",
        loaded.source.display(),
        loaded.declaration.task.units.len(),
        report.warnings.len()
    )?;
    Ok(())
}
