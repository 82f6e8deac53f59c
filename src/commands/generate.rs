//! Generate command implementation
//!
//! Thin shell over the generation orchestrator: parses `--data` pairs,
//! wires up the real renderer and command runner, and formats either the
//! dry-run preview or the committed summary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use console::Style;

use crate::cli::GenerateArgs;
use crate::error::{PacksmithError, Result};
use crate::generate::{GenerateOutcome, GenerateRequest, Generator, Preview};
use crate::hooks::SystemRunner;
use crate::render::{RenderMode, RenderedFile, TemplateRenderer};

/// Run generate command
pub fn run(packs_root: Option<PathBuf>, args: GenerateArgs, verbose: bool) -> Result<()> {
    let store = super::open_store(packs_root)?;
    let target_dir = super::get_target_path(args.dest)?;
    let data = parse_data_args(&args.data)?;

    let renderer = TemplateRenderer;
    let runner = SystemRunner::new(args.hook_timeout.map(Duration::from_secs));
    let generator = Generator::new(&store, &renderer, &runner);

    let request = GenerateRequest {
        pack_id: args.pack,
        version: args.pack_version,
        archetype_id: args.archetype,
        data,
        target_dir: target_dir.clone(),
        force: args.force,
        dry_run: args.dry_run,
        hook_timeout: args.hook_timeout.map(Duration::from_secs),
    };

    match generator.generate(&request)? {
        GenerateOutcome::Preview(preview) => display_preview(&preview),
        GenerateOutcome::Committed(summary) => {
            println!(
                "{} {} {} ({}) into {}",
                Style::new().green().bold().apply_to("Generated"),
                Style::new().bold().yellow().apply_to(&summary.resolved.pack_id),
                summary.resolved.version,
                summary.record_id,
                target_dir.display()
            );
            display_files(&summary.files);

            if summary.conflicts.has_conflicts() {
                println!(
                    "  {} {} existing file(s) overwritten",
                    Style::new().yellow().bold().apply_to("Forced:"),
                    summary.conflicts.count()
                );
            }

            if !summary.patch_report.results.is_empty() {
                println!(
                    "  {} {}",
                    Style::new().bold().apply_to("Patches:"),
                    summary.patch_report.summary()
                );
            }
            for line in &summary.hooks_summary {
                println!("  {} {}", Style::new().bold().apply_to("Ran:"), line);
            }
            for line in &summary.checks_summary {
                println!("  {} {}", Style::new().bold().apply_to("Checked:"), line);
            }

            if verbose {
                println!();
                println!("Phase timings:");
                for timing in &summary.timings {
                    println!("  {:<22} {:>8.2?}", timing.phase.to_string(), timing.duration);
                }
            }
        }
    }

    Ok(())
}

/// Parse repeated `key=value` arguments into the template data map.
fn parse_data_args(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut data = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(PacksmithError::InvalidDataArg { arg: pair.clone() });
        };
        if key.is_empty() {
            return Err(PacksmithError::InvalidDataArg { arg: pair.clone() });
        }
        data.insert(key.to_string(), value.to_string());
    }
    Ok(data)
}

fn display_preview(preview: &Preview) {
    println!(
        "{} {} {} (dry run)",
        Style::new().cyan().bold().apply_to("Plan for"),
        Style::new().bold().yellow().apply_to(&preview.resolved.pack_id),
        preview.resolved.version
    );
    display_files(&preview.files);
    println!(
        "  {} file(s) would be created",
        preview.conflicts.creates.len()
    );

    if preview.conflicts.has_conflicts() {
        println!(
            "  {} {} file(s) already exist and would need --force:",
            Style::new().red().bold().apply_to("Conflicts:"),
            preview.conflicts.count()
        );
        for path in &preview.conflicts.modifies {
            println!("    {}", Style::new().red().apply_to(path.display()));
        }
    }

    if !preview.patches.is_empty() {
        println!("  {}", Style::new().bold().apply_to("Patches:"));
        for patch in &preview.patches {
            println!("    {}", patch);
        }
    }
    if !preview.post_generate.is_empty() {
        println!("  {}", Style::new().bold().apply_to("Post-generate commands:"));
        for command in &preview.post_generate {
            println!("    {}", command);
        }
    }
    if !preview.checks.is_empty() {
        println!("  {}", Style::new().bold().apply_to("Check commands:"));
        for command in &preview.checks {
            println!("    {}", command);
        }
    }
}

fn display_files(files: &[RenderedFile]) {
    for file in files {
        let tag = match file.mode {
            RenderMode::Rendered => Style::new().green().apply_to("render"),
            RenderMode::Copied => Style::new().cyan().apply_to("copy  "),
        };
        if file.src_rel == file.dest_rel {
            println!("  {} {}", tag, file.dest_rel.display());
        } else {
            // Path rewritten by rename rules or .tmpl stripping
            println!(
                "  {} {} (from {})",
                tag,
                file.dest_rel.display(),
                file.src_rel.display()
            );
        }
    }
}
