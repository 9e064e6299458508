//! Command-line surface of `berth`.
//!
//! Command output goes to the writer handed to [`run`]; logs go to stderr.

pub mod order;
pub mod plan;
pub mod template;
pub mod validate;

use std::{io::Write, path::PathBuf};

use berth_config::{LoadedDeclaration, Loader};
use berth_core::ValidationWarning;
use berth_observe::{Event, EventKind, LoggerConfig, LoggerFormat, LoggerLevel, log_event};
use clap::{Args, Parser, Subcommand};

/// Validate container stack declarations and turn them into ordered deployment plans.
#[derive(Parser, Debug)]
#[command(name = "berth")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    BERTH_LOG_LEVEL     Log filter directive (default: info)
    BERTH_LOG_FORMAT    Log format: text|json|journald (default: text)

Declared parameters may name their own override variable (e.g. FRAPPE_TAG).
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log filter, a level or an EnvFilter directive
    #[arg(long, global = true, env = "BERTH_LOG_LEVEL", default_value = "info")]
    pub log_level: LoggerLevel,

    /// Log format
    #[arg(long, global = true, env = "BERTH_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Include log targets in output
    #[arg(long, global = true)]
    pub log_targets: bool,
}

impl Cli {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            with_targets: self.log_targets,
            ..LoggerConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a declaration and report every error and warning
    Validate(validate::ValidateArgs),
    /// Print the start order and startup waves
    Order(order::OrderArgs),
    /// Build the deployment plan and hand it to a provisioner
    Plan(plan::PlanArgs),
    /// Render the built-in stack template as a declaration
    Template(template::TemplateArgs),
}

/// Declaration file plus parameter sources, shared by the commands that read one.
#[derive(Args, Debug, Clone)]
pub struct DeclarationArgs {
    /// Stack declaration (TOML)
    pub file: PathBuf,

    /// Parameter override, repeatable
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Ignore parameter environment variables
    #[arg(long)]
    pub no_env: bool,
}

impl DeclarationArgs {
    pub fn load(&self) -> anyhow::Result<LoadedDeclaration> {
        let mut loader = Loader::new().with_overrides(&self.params)?;
        if self.no_env {
            loader = loader.without_env();
        }
        let loaded = loader.load(&self.file)?;

        let stack = loaded.declaration.stack.name.clone();
        log_event(
            &Event::new(EventKind::DeclarationLoaded)
                .with_stack(&stack)
                .with_reason(self.file.display().to_string()),
        );
        log_event(
            &Event::new(EventKind::ParametersResolved)
                .with_stack(stack)
                .with_count(loaded.parameters.len()),
        );
        Ok(loaded)
    }
}

/// One `WarningRaised` event per warning.
pub fn log_warnings(warnings: &[ValidationWarning]) {
    for w in warnings {
        let mut event = Event::new(EventKind::WarningRaised).with_reason(&w.message);
        if let Some(unit) = &w.unit {
            event = event.with_unit(unit.as_str());
        }
        log_event(&event);
    }
}

pub fn run(command: Commands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Validate(args) => validate::execute(&args, out),
        Commands::Order(args) => order::execute(&args, out),
        Commands::Plan(args) => plan::execute(&args, out),
        Commands::Template(args) => template::execute(&args, out),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn stack_file(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../stacks")
            .join(name)
    }

    pub(crate) fn declaration(name: &str) -> DeclarationArgs {
        DeclarationArgs {
            file: stack_file(name),
            params: Vec::new(),
            no_env: true,
        }
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "berth",
            "plan",
            "stack.toml",
            "--param",
            "frappe_tag=v15",
            "-p",
            "redis_tag=7",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_str(), "debug");
        assert_eq!(cli.log_format, LoggerFormat::Json);
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.declaration.params, ["frappe_tag=v15", "redis_tag=7"]);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_log_format() {
        assert!(Cli::try_parse_from(["berth", "--log-format", "yaml", "validate", "x.toml"]).is_err());
    }

    #[test]
    fn template_variants_parse() {
        let cli = Cli::try_parse_from([
            "berth",
            "template",
            "--storage",
            "dedicated",
            "--registry",
            "public",
        ])
        .unwrap();
        match cli.command {
            Commands::Template(args) => {
                assert_eq!(args.storage.to_string(), "dedicated");
                assert_eq!(args.registry.to_string(), "public");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stack_with_warnings_still_orders() {
        let loaded = declaration("earnipay.toml").load().unwrap();
        let warnings = berth_core::validate_with_raw(&loaded.declaration, Some(&loaded.raw))
            .into_result()
            .unwrap();
        assert_eq!(warnings.len(), 3);
        log_warnings(&warnings);

        let args = order::OrderArgs {
            declaration: declaration("earnipay.toml"),
            json: true,
        };
        let mut out = Vec::new();
        order::execute(&args, &mut out).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn declaration_args_load_stack() {
        let loaded = declaration("earnipay.toml").load().unwrap();
        assert_eq!(loaded.declaration.stack.name, "earnipay");
    }
}
