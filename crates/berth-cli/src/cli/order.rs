//! order subcommand
//!
//! Prints the start order, one unit per line, followed by the startup waves.

use std::io::Write;

use berth_core::{DependencyGraph, validate_with_raw};
use berth_observe::{Event, EventKind, log_event};
use clap::Args;
use serde_json::json;

use crate::cli::{DeclarationArgs, log_warnings};

#[derive(Args, Debug, Clone)]
pub struct OrderArgs {
    #[command(flatten)]
    pub declaration: DeclarationArgs,

    /// Print `{ "order": [...], "waves": [[...]] }` instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &OrderArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let loaded = args.declaration.load()?;
    let decl = &loaded.declaration;
    let warnings = validate_with_raw(decl, Some(&loaded.raw)).into_result()?;
    log_warnings(&warnings);

    let graph = DependencyGraph::from_units(decl.units())?;
    let order = graph.resolve()?;
    let waves = graph.waves()?;
    log_event(
        &Event::new(EventKind::OrderResolved)
            .with_stack(&decl.stack.name)
            .with_count(order.len()),
    );

    if args.json {
        let doc = json!({ "order": order, "waves": waves });
        writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        return Ok(());
    }

    for (i, id) in order.iter().enumerate() {
        let wave = waves
            .iter()
            .position(|w| w.contains(id))
            .unwrap_or_default();
        let unit = decl.unit(id.as_str());
        let waits: Vec<String> = unit
            .map(|u| {
                u.depends_on
                    .iter()
                    .map(|d| format!("{}:{}", d.unit, d.condition))
                    .collect()
            })
            .unwrap_or_default();

        if waits.is_empty() {
            writeln!(out, "{:>2}. {id} (wave {wave})", i + 1)?;
        } else {
            writeln!(out, "{:>2}. {id} (wave {wave}) after {}", i + 1, waits.join(", "))?;
        }
    }
    for (n, wave) in waves.iter().enumerate() {
        let names: Vec<&str> = wave.iter().map(|id| id.as_str()).collect();
        writeln!(out, "wave {n}: {}", names.join(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::declaration;

    #[test]
    fn prints_order_and_waves() {
        let args = OrderArgs {
            declaration: declaration("earnipay.toml"),
            json: false,
        };
        let mut out = Vec::new();
        execute(&args, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " 1. mariadb (wave 0)");
        assert_eq!(lines[1], " 2. redis (wave 0)");
        assert_eq!(
            lines[2],
            " 3. frappe (wave 1) after mariadb:HEALTHY, redis:HEALTHY"
        );
        assert_eq!(lines[3], "wave 0: mariadb redis");
        assert_eq!(lines[4], "wave 1: frappe");
    }

    #[test]
    fn json_output() {
        let args = OrderArgs {
            declaration: declaration("earnipay-dedicated.toml"),
            json: true,
        };
        let mut out = Vec::new();
        execute(&args, &mut out).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["order"], json!(["mariadb", "redis", "frappe"]));
        assert_eq!(doc["waves"][1], json!(["frappe"]));
    }
}
