//! Import command handler
//!
//! Plays the part of the import dialog: opens a session, feeds it one file,
//! applies the review edits given as flags, then prints or submits.

use anyhow::{Context, Result, anyhow};
use colored::*;
use uuid::Uuid;

use super::ImportArgs;
use super::render::{render_grid, render_summary};
use crate::config::ImportConfig;
use crate::import::mapping::{CanonicalField, lookup_header};
use crate::import::{IngestionController, IntakeFile};
use crate::review::{DateEditScope, ReviewGrid, SortDirection};
use crate::submit::{HttpInvoiceApi, build_requests, submit_records};

/// Resolve a field given either as its key or as its header text
pub fn resolve_field(name: &str) -> Result<CanonicalField> {
    match name.parse::<CanonicalField>() {
        Ok(field) => Ok(field),
        Err(e) => lookup_header(name).map(|m| m.field).ok_or_else(|| anyhow!(e)),
    }
}

/// Ids of the records at the given 1-based display rows
fn ids_for_rows(grid: &ReviewGrid, rows: &[usize]) -> Result<Vec<Uuid>> {
    rows.iter()
        .map(|&row| {
            row.checked_sub(1)
                .and_then(|idx| grid.at(idx))
                .map(|r| r.id)
                .with_context(|| format!("No row {} (grid has {} row(s))", row, grid.count()))
        })
        .collect()
}

/// Apply sort, date and delete flags to the parsed records
fn apply_review_edits(controller: &mut IngestionController, args: &ImportArgs) -> Result<()> {
    let grid = controller.grid_mut().context("Import session closed unexpectedly")?;

    if let Some(name) = &args.sort_by {
        let field = resolve_field(name)?;
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        grid.sort_by(field, direction);
    }

    if let Some(date) = &args.due_date {
        let updated = grid
            .edit_date(CanonicalField::PaymentDueDate, date, DateEditScope::All)
            .context("Invalid --due-date")?;
        log::info!("Set due date {} on {} record(s)", date, updated);
    }

    // Row numbers index the sorted grid before any deletion
    let mut rows = args.delete_rows.clone();
    rows.sort_unstable();
    rows.dedup();
    let ids = ids_for_rows(grid, &rows)?;
    for id in ids {
        controller.delete_record(id)?;
    }

    Ok(())
}

pub async fn handle_import_command(args: ImportArgs, config: ImportConfig) -> Result<()> {
    let file = IntakeFile::from_path(&args.file, args.mime.clone())?;

    let mut controller = IngestionController::new(config.intake.clone());
    controller.open();
    controller.accept_file(file)?;

    let parsed = controller
        .wait_for_completion()
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    if parsed == 0 {
        println!("{}", "The spreadsheet has no data rows.".yellow());
        return Ok(());
    }

    apply_review_edits(&mut controller, &args)?;

    let grid = controller.grid().context("Import session closed unexpectedly")?;
    if grid.is_empty() {
        println!("{}", "Every record was deleted; nothing left to review.".yellow());
        return Ok(());
    }

    if args.json {
        let requests = build_requests(grid.records(), &config.submission.base_currency);
        println!("{}", serde_json::to_string_pretty(&requests)?);
    } else {
        print!("{}", render_grid(grid));
        println!();
        println!("{}", render_summary(grid));
    }

    if args.submit {
        let api = HttpInvoiceApi::from_config(&config.submission)?;
        println!("Submitting to {}...", api.endpoint().cyan());

        let report = submit_records(&api, grid.records(), &config.submission).await?;
        controller.complete_submission();

        println!(
            "{} Created {} invoice(s), total payable {:.2}",
            "✓".bright_green(),
            report.submitted,
            report.total_payable
        );
    }

    Ok(())
}
