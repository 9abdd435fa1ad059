//! Plain-text rendering of the review grid

use colored::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::import::mapping::{FieldKind, FieldMapping, displayable_mappings};
use crate::import::record::{DraftRecord, FieldValue};
use crate::review::ReviewGrid;

const MAX_CELL_WIDTH: usize = 24;

fn cell_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Number(n) => format!("{:.2}", n),
        FieldValue::Code(0) => String::new(),
        other => other.to_string(),
    }
}

/// Cut a string to at most `max` display columns, marking the cut with `…`
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{}{}", fill, text)
    } else {
        format!("{}{}", text, fill)
    }
}

fn row_cells(index: usize, record: &DraftRecord, columns: &[&FieldMapping]) -> Vec<String> {
    let mut cells = vec![(index + 1).to_string()];
    cells.extend(
        columns
            .iter()
            .map(|m| truncate(&cell_text(&record.get(m.field)), MAX_CELL_WIDTH)),
    );
    cells
}

/// Render the grid as an aligned table with a `#` column of 1-based row numbers
pub fn render_grid(grid: &ReviewGrid) -> String {
    let columns: Vec<&FieldMapping> = displayable_mappings().collect();

    let header: Vec<String> = std::iter::once("#".to_string())
        .chain(columns.iter().map(|m| m.display_label.to_string()))
        .collect();
    let rows: Vec<Vec<String>> = grid
        .iter()
        .enumerate()
        .map(|(i, r)| row_cells(i, r, &columns))
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|r| r[col].width())
                .chain(std::iter::once(header[col].width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let right_align: Vec<bool> = std::iter::once(true)
        .chain(columns.iter().map(|m| m.field.kind() == FieldKind::Amount))
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i], right_align[i]))
        .collect();
    out.push_str(&header_line.join("  ").bold().to_string());
    out.push('\n');

    for (row, record) in rows.iter().zip(grid.iter()) {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| pad(c, widths[i], right_align[i]))
            .collect();
        let line = line.join("  ");
        if record.missing_required().is_empty() {
            out.push_str(&line);
        } else {
            out.push_str(&line.yellow().to_string());
        }
        out.push('\n');
    }

    out
}

/// One-line summary: record count and payable total
pub fn render_summary(grid: &ReviewGrid) -> String {
    let incomplete = grid.incomplete().len();
    let mut summary = format!(
        "{} record(s), total payable {}",
        grid.count().to_string().bright_green().bold(),
        format!("{:.2}", grid.total_payable()).bright_green()
    );
    if incomplete > 0 {
        summary.push_str(&format!(
            ", {} missing required fields",
            incomplete.to_string().yellow()
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_display_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ÇŞĞÜÖİ", 6), "ÇŞĞÜÖİ");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_render_grid_lists_rows_in_order() {
        colored::control::set_override(false);
        let mut grid = ReviewGrid::new();
        grid.replace(vec![
            DraftRecord {
                invoice_number: "INV-001".into(),
                payable_amount: 1000.0,
                ..DraftRecord::new()
            },
            DraftRecord {
                invoice_number: "INV-002".into(),
                ..DraftRecord::new()
            },
        ]);

        let table = render_grid(&grid);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Invoice Number"));
        assert!(lines[1].trim_start().starts_with("1  INV-001"));
        assert!(lines[1].contains("1000.00"));
        assert!(lines[2].contains("INV-002"));
    }

    #[test]
    fn test_summary() {
        colored::control::set_override(false);
        let grid = ReviewGrid::new();
        assert_eq!(render_summary(&grid), "0 record(s), total payable 0.00");
    }
}
