//! Write an empty import template workbook

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

use crate::import::mapping::FIELD_MAPPINGS;

pub const TEMPLATE_SHEET_NAME: &str = "Invoices";
const DEFAULT_COLUMN_WIDTH: f64 = 16.0;

fn build_template() -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(TEMPLATE_SHEET_NAME)?;
    write_header(worksheet)?;
    Ok(workbook)
}

fn write_header(worksheet: &mut Worksheet) -> Result<()> {
    let bold = Format::new().set_bold();

    for (col, mapping) in FIELD_MAPPINGS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, mapping.header_key, &bold)?;
        worksheet.set_column_width(col, mapping.column_width.unwrap_or(DEFAULT_COLUMN_WIDTH))?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    Ok(())
}

/// Template workbook as xlsx bytes
pub fn template_bytes() -> Result<Vec<u8>> {
    build_template()?
        .save_to_buffer()
        .context("Failed to serialize template workbook")
}

pub fn write_template(path: &Path) -> Result<()> {
    build_template()?
        .save(path)
        .with_context(|| format!("Failed to save template: {}", path.display()))?;
    log::info!("Wrote import template to {}", path.display());
    Ok(())
}
