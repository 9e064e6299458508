//! template subcommand

use std::{io::Write, path::PathBuf};

use berth_core::{RegistryVariant, StackTemplate, StorageVariant};
use berth_observe::{Event, EventKind, log_event};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Where storage comes from: existing|dedicated
    #[arg(long, default_value_t = StorageVariant::Existing)]
    pub storage: StorageVariant,

    /// Where images come from: private|public
    #[arg(long, default_value_t = RegistryVariant::Private)]
    pub registry: RegistryVariant,

    /// Stack name; cluster and service names derive from it
    #[arg(long, default_value = "earnipay")]
    pub name: String,

    /// Write the declaration here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

pub fn execute(args: &TemplateArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let template = StackTemplate::new(args.storage, args.registry).with_name(&args.name);
    let text = template.to_toml()?;
    log_event(
        &Event::new(EventKind::TemplateRendered)
            .with_stack(&args.name)
            .with_reason(format!("{}/{}", args.storage, args.registry)),
    );

    match &args.out {
        Some(path) => {
            std::fs::write(path, &text)?;
            writeln!(out, "template written to {}", path.display())?;
        }
        None => out.write_all(text.as_bytes())?,
    }
    Ok(())
}
