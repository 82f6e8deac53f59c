//! History command implementation
//!
//! Reads the target's `.packsmith/state.json` (migrating older schema
//! versions in memory) and prints the generation records, newest last.

use console::Style;

use std::path::PathBuf;

use crate::cli::HistoryArgs;
use crate::error::Result;
use crate::state::{self, GenerationRecord, GenerationStatus};

/// Run history command
pub fn run(args: HistoryArgs) -> Result<()> {
    let target_dir = super::get_target_path(args.dest)?;

    let Some(project_state) = state::read(&target_dir)? else {
        println!("No generation history in {}.", target_dir.display());
        return Ok(());
    };

    if project_state.generations.is_empty() {
        println!("No generation history in {}.", target_dir.display());
        return Ok(());
    }

    println!(
        "Generation history of {} ({}):",
        target_dir.display(),
        project_state.generations.len()
    );
    println!();

    for record in &project_state.generations {
        display_record(record);
        println!();
    }

    if let Some(updated_at) = project_state.updated_at {
        println!(
            "Last updated: {}",
            updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

fn display_record(record: &GenerationRecord) {
    let status = match record.status {
        GenerationStatus::Success => Style::new().green().apply_to("success"),
        GenerationStatus::Failed => Style::new().red().apply_to("failed"),
    };

    println!(
        "  {} [{}]",
        Style::new().bold().yellow().apply_to(&record.id),
        status
    );
    println!(
        "    {} {} {} ({})",
        Style::new().bold().apply_to("Pack:"),
        record.pack_id,
        record.pack_version,
        record.archetype_id
    );
    println!(
        "    {} {}",
        Style::new().bold().apply_to("When:"),
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !record.inputs.is_empty() {
        let inputs: Vec<String> = record
            .inputs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!(
            "    {} {}",
            Style::new().bold().apply_to("Inputs:"),
            inputs.join(", ")
        );
    }
    if let Some(ref patches) = record.patches_summary {
        println!(
            "    {} {}",
            Style::new().bold().apply_to("Patches:"),
            patches
        );
    }
    if let Some(ref hooks) = record.hooks_summary {
        for line in hooks {
            println!("    {} {}", Style::new().bold().apply_to("Ran:"), line);
        }
    }
    if let Some(ref checks) = record.checks_summary {
        for line in checks {
            println!("    {} {}", Style::new().bold().apply_to("Checked:"), line);
        }
    }
}
