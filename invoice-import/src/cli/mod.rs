//! Command-line interface

pub mod import;
pub mod render;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::import::mapping::FIELD_MAPPINGS;

#[derive(Parser)]
#[command(name = "invoice-import", version, about = "Bulk-create invoices from a spreadsheet")]
pub struct Cli {
    /// Config file (defaults to <config dir>/invoice-import/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the recognized spreadsheet headers
    Fields,
    /// Write an empty import template workbook
    Template {
        /// Output .xlsx path
        path: PathBuf,
    },
    /// Parse a spreadsheet, review the records and optionally submit them
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Spreadsheet to import (.xlsx, .xls, .ods, .csv)
    pub file: PathBuf,

    /// MIME type of the file; derived from the extension when omitted
    #[arg(long)]
    pub mime: Option<String>,

    /// Sort the records by a field key (e.g. payableAmount) or header text
    #[arg(long, value_name = "FIELD")]
    pub sort_by: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort_by")]
    pub desc: bool,

    /// Set the payment due date (YYYY-MM-DD) on every record
    #[arg(long, value_name = "DATE")]
    pub due_date: Option<String>,

    /// Delete a record by row number (repeatable)
    ///
    /// Rows are numbered after --sort-by is applied and before any deletion,
    /// matching the `#` column of the same command run without --delete-row.
    #[arg(long = "delete-row", value_name = "N")]
    pub delete_rows: Vec<usize>,

    /// Submit the reviewed records to the configured endpoint
    #[arg(long)]
    pub submit: bool,

    /// Print the submission payload as JSON instead of the table
    #[arg(long)]
    pub json: bool,
}

pub fn handle_fields_command() -> Result<()> {
    println!(
        "{:<18} {:<24} {:<8} {}",
        "Header".bold(),
        "Field".bold(),
        "Kind".bold(),
        "Required".bold()
    );
    for mapping in FIELD_MAPPINGS {
        let required = if mapping.required { "yes".green() } else { "".normal() };
        println!(
            "{:<18} {:<24} {:<8} {}",
            mapping.header_key,
            mapping.field.key().cyan(),
            mapping.field.kind().to_string(),
            required
        );
    }
    Ok(())
}

pub fn handle_template_command(path: PathBuf) -> Result<()> {
    crate::template::write_template(&path)?;
    println!("Template written to {}", path.display().to_string().cyan());
    Ok(())
}
