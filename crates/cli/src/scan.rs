//! `pvmerge scan`: detect conflicts and show what resolution would do.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use pvmerge_core::pipeline::{MergeEngine, ScanOutcome};
use pvmerge_core::report::ConflictReport;

use crate::style;

pub fn run(engine: &MergeEngine, details: bool, export: Option<&Path>) -> Result<()> {
    let outcome = engine.scan().context("scan failed")?;
    let report = outcome.report();

    print_packages(&outcome, &report);
    print_conflicts(&report);
    if details {
        print_members(&outcome);
    }
    print_plans(&outcome);

    if let Some(path) = export {
        let json = report
            .to_json_pretty()
            .context("failed to serialize conflict report")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("{}", style::success(&format!("Report saved to {}", path.display())));
    }
    Ok(())
}

fn print_packages(outcome: &ScanOutcome, report: &ConflictReport) {
    println!();
    println!(
        "{}",
        style::header(&format!(
            "Packages ({}, {} entries)",
            outcome.catalog.len(),
            outcome.catalog.entry_count()
        ))
    );
    if !outcome.catalog.ignored().is_empty() {
        println!(
            "{}",
            style::dim(&format!("ignored: {}", outcome.catalog.ignored().join(", ")))
        );
    }
    if report.packages.is_empty() {
        println!("{}", style::warn("No manifests found"));
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Package", "Priority", "Entries", "Conflicts", "Partners"]);
    for package in &report.packages {
        let partners = package
            .partners
            .iter()
            .map(|p| format!("{} ({})", p.name, p.shared_conflicts))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&package.name),
            Cell::new(package.priority),
            Cell::new(package.total_entries),
            Cell::new(package.conflicting_entries),
            Cell::new(partners),
        ]);
    }
    println!("{table}");
}

fn print_conflicts(report: &ConflictReport) {
    println!();
    if report.conflicts.is_empty() {
        println!("{}", style::success("No conflicts found"));
        return;
    }
    println!(
        "{}",
        style::header(&format!(
            "Conflicts ({} id, {} title)",
            report.id_conflict_count(),
            report.title_conflict_count()
        ))
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Key", "Songs", "Ids", "Sources", "Winner", "Losers"]);
    for row in &report.conflicts {
        table.add_row(vec![
            Cell::new(row.kind),
            Cell::new(&row.key),
            Cell::new(row.titles.join(", ")),
            Cell::new(style::id_list(&row.ids)),
            Cell::new(row.sources.join(", ")),
            Cell::new(style::winner(&row.winner)),
            Cell::new(row.losers.join(", ")),
        ]);
    }
    println!("{table}");
}

fn print_members(outcome: &ScanOutcome) {
    for group in &outcome.groups {
        println!();
        println!(
            "{}",
            style::header(&format!("{} {}", group.conflict_kind, group.key))
        );
        for member in &group.members {
            let owner = if member.owner_package == group.winner.owner_package {
                style::winner(&member.owner_package)
            } else {
                style::loser(&member.owner_package)
            };
            println!(
                "  pv_{:<6} {:<40} {} {}",
                member.id,
                member.display_title(),
                owner,
                style::dim(&member.origin_path.display().to_string())
            );
        }
    }
}

fn print_plans(outcome: &ScanOutcome) {
    println!();
    if outcome.plans.is_empty() {
        println!("{}", style::success("Nothing to resolve"));
        return;
    }
    println!(
        "{}",
        style::header(&format!("Removal plans ({})", outcome.plans.len()))
    );
    for plan in outcome.plans.values() {
        println!(
            "  {:<24} {}",
            plan.package_name,
            style::id_list(plan.ids_to_remove())
        );
    }
}
