//! `glpost create` - validate a sheet, post one journal entry per group and
//! write the outcomes back into a copy of the sheet.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glpost_journal::{feedback_rows, prepare, GroupResult, JournalEntryInput, PreparedBatch};
use serde_json::json;
use tracing::{info, warn};

use crate::exit_codes::EXIT_PARTIAL;
use crate::settings::Settings;
use crate::submit::ApiClient;
use crate::writeback::{apply_feedback, default_output_path, write_output};
use crate::CliError;

pub fn cmd_create(
    settings: &Settings,
    input: PathBuf,
    out: Option<PathBuf>,
    dry_run: bool,
    json_output: bool,
) -> Result<(), CliError> {
    if dry_run && out.is_some() {
        return Err(CliError::args("--out cannot be combined with --dry-run")
            .with_hint("a dry run writes nothing; drop --out"));
    }

    let config = &settings.journal;
    let (csv_data, table) = crate::read_table(&input, config)?;
    let batch = prepare(&table, config)?;
    let entries = batch.entries(config);

    if dry_run {
        return print_dry_run(&batch, &entries);
    }

    let credentials = settings.credentials()?;
    let timeout = Duration::from_secs(settings.timeout_secs);
    let client = ApiClient::new(&settings.server_base_address, credentials, timeout)?;
    info!(
        server = %settings.server_base_address,
        production = settings.production,
        "submitting {} groups",
        batch.groups.len()
    );

    let results = submit_groups(&client, &batch, &entries);
    let failed = results.iter().filter(|r| !r.outcome.success).count();

    let feedback = feedback_rows(&results, table.span());
    let posted = apply_feedback(&csv_data, config, &feedback)?;
    let out_path = out.unwrap_or_else(|| default_output_path(&input));
    write_output(&out_path, &posted)?;
    info!("results written to {}", out_path.display());

    if json_output {
        print_summary_json(&results, &out_path)?;
    } else {
        println!("Creation process completed! {} groups sent.", results.len());
    }

    if failed > 0 {
        return Err(CliError {
            code: EXIT_PARTIAL,
            message: format!("{} of {} groups were rejected", failed, results.len()),
            hint: Some(format!("see the Warning column in {}", out_path.display())),
        });
    }
    Ok(())
}

/// Submit groups one at a time, in partition order. A rejected group does
/// not stop the run.
fn submit_groups(
    client: &ApiClient,
    batch: &PreparedBatch,
    entries: &[JournalEntryInput],
) -> Vec<GroupResult> {
    batch
        .groups
        .iter()
        .zip(entries)
        .enumerate()
        .map(|(position, (group, entry))| {
            let label = group.key.label(position);
            let outcome = client.create_journal_entry(entry, &label);
            if !outcome.success {
                warn!(group = %label, "group rejected, continuing with the next one");
            }
            GroupResult { indices: group.origins(), outcome }
        })
        .collect()
}

fn print_dry_run(batch: &PreparedBatch, entries: &[JournalEntryInput]) -> Result<(), CliError> {
    let groups: Vec<_> = batch
        .groups
        .iter()
        .zip(entries)
        .enumerate()
        .map(|(position, (group, entry))| {
            json!({
                "group": group.key.label(position),
                "input": entry,
            })
        })
        .collect();
    let text = serde_json::to_string_pretty(&json!({ "mode": batch.mode, "groups": groups }))
        .map_err(|e| CliError::io(format!("JSON encoding error: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_summary_json(results: &[GroupResult], out_path: &Path) -> Result<(), CliError> {
    let failed = results.iter().filter(|r| !r.outcome.success).count();
    let summary = json!({
        "groups_sent": results.len(),
        "failed": failed,
        "output": out_path.display().to_string(),
        "results": results,
    });
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|e| CliError::io(format!("JSON encoding error: {}", e)))?;
    println!("{}", text);
    Ok(())
}
