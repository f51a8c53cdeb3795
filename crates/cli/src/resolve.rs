//! `pvmerge resolve` and `pvmerge restore`.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use pvmerge_core::conflict::{ExecutionReport, PackageOutcome};
use pvmerge_core::pipeline::{MergeEngine, ResolveOptions, RestoreSummary};

use crate::style;

pub fn run_resolve(engine: &MergeEngine, options: ResolveOptions) -> Result<()> {
    let outcome = engine.resolve(options).context("resolution failed")?;

    if let Some(restore) = &outcome.restore {
        print_restore(restore);
    }

    println!();
    if outcome.scan.plans.is_empty() {
        println!("{}", style::success("No actionable conflicts. Nothing to resolve."));
        return Ok(());
    }

    let report = &outcome.execution;
    let title = if report.dry_run {
        format!("Dry run ({} package(s))", report.packages.len())
    } else {
        format!("Resolution ({} package(s))", report.packages.len())
    };
    println!("{}", style::header(&title));
    println!("{}", outcome_table(report));

    println!();
    if report.dry_run {
        println!("{}", style::warn("Dry run: no files were changed"));
    } else {
        println!(
            "{}",
            style::success(&format!(
                "{} declaration(s) disabled across {} manifest(s) in {} ms",
                report.disabled_count(),
                report.rewritten_count(),
                (outcome.completed_at - outcome.started_at).num_milliseconds()
            ))
        );
    }

    let failed = report.failed_count();
    if failed > 0 {
        for failure in report.failures() {
            if let PackageOutcome::Failed { error } = &failure.outcome {
                eprintln!("{}", style::error(&format!("{}: {error}", failure.package)));
            }
        }
        anyhow::bail!("{failed} package(s) could not be resolved");
    }
    Ok(())
}

pub fn run_restore(engine: &MergeEngine) -> Result<()> {
    let summary = engine.restore_all().context("restore failed")?;
    print_restore(&summary);
    Ok(())
}

fn print_restore(summary: &RestoreSummary) {
    println!();
    if summary.restored.is_empty() {
        println!("{}", style::warn("No backups to restore"));
    } else {
        println!(
            "{}",
            style::success(&format!(
                "Restored {} manifest(s): {}",
                summary.restored.len(),
                summary.restored.join(", ")
            ))
        );
    }
    if !summary.without_backup.is_empty() {
        println!(
            "{}",
            style::dim(&format!("no backup: {}", summary.without_backup.join(", ")))
        );
    }
}

fn outcome_table(report: &ExecutionReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Package", "Outcome", "Disabled", "Already", "Missing", "Backup"]);

    for package in &report.packages {
        let label = package.outcome.label();
        let row = match &package.outcome {
            PackageOutcome::DryRun { ids } => vec![
                Cell::new(&package.package),
                Cell::new(label),
                Cell::new(style::id_list(ids)),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ],
            PackageOutcome::Applied {
                affected,
                already_disabled,
                missing,
                backup,
                backup_created,
                ..
            } => vec![
                Cell::new(&package.package),
                Cell::new(label),
                Cell::new(style::id_list(affected)),
                Cell::new(style::id_list(already_disabled)),
                Cell::new(style::id_list(missing)),
                Cell::new(format!(
                    "{}{}",
                    backup.display(),
                    if *backup_created { " (new)" } else { "" }
                )),
            ],
            PackageOutcome::Failed { .. } => vec![
                Cell::new(&package.package),
                Cell::new(style::error(label)),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ],
            _ => vec![
                Cell::new(&package.package),
                Cell::new(style::dim(label)),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ],
        };
        table.add_row(row);
    }
    table
}
