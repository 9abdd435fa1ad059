//! Turn raw cell rows into draft records
//!
//! Each column's header is resolved through the field mapping table, each cell
//! is coerced to its field's kind, and the business rules run on the finished
//! record.

use chrono::{Duration, NaiveDateTime};

use super::decode::{RawCell, RawCellGrid, parse_iso_datetime};
use super::mapping::{self, CanonicalField, FALLBACK_FIELD, FieldKind};
use super::record::{DATE_FORMAT, DraftRecord, FieldValue};

/// Hours added to a date cell before truncating it to a calendar date
///
/// Midnight values that were shifted into the previous day by a timezone
/// conversion land back on the intended date.
pub const DATE_SHIFT_HOURS: i64 = 3;

/// Document type code: electronic invoice
pub const DOCUMENT_TYPE_E_INVOICE: i32 = 1;
/// Document type code: electronic archive invoice
pub const DOCUMENT_TYPE_E_ARCHIVE: i32 = 2;
/// E-invoice subtype code: archive
pub const E_INVOICE_TYPE_ARCHIVE: i32 = 2;

/// Normalize a date cell value to `YYYY-MM-DD`
pub fn normalize_date(value: NaiveDateTime) -> String {
    (value + Duration::hours(DATE_SHIFT_HOURS))
        .format(DATE_FORMAT)
        .to_string()
}

/// Numeric value of an amount cell, 0 when missing or non-numeric
pub fn parse_amount(cell: &RawCell) -> f64 {
    let value = match cell {
        RawCell::Number(n) => *n,
        RawCell::Text(s) | RawCell::Untyped(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        RawCell::Empty | RawCell::Date(_) => 0.0,
    };
    if value.is_finite() { value } else { 0.0 }
}

/// Base-10 integer value of a code cell, 0 when missing or non-numeric
pub fn parse_code(cell: &RawCell) -> i32 {
    match cell {
        RawCell::Number(n) if n.is_finite() => n.trunc() as i32,
        RawCell::Text(s) | RawCell::Untyped(s) => {
            let s = s.trim();
            s.parse::<i32>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .map(|n| n.trunc() as i32)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Coerce a raw cell into a value of the given field kind
///
/// Untyped cells count as dates only when their text is an ISO date, and
/// text fields keep their source text unchanged.
pub fn coerce_cell(kind: FieldKind, cell: &RawCell) -> FieldValue {
    match kind {
        FieldKind::Date => match cell {
            RawCell::Date(dt) => FieldValue::Date(normalize_date(*dt)),
            RawCell::Untyped(s) => FieldValue::Date(
                parse_iso_datetime(s)
                    .map(normalize_date)
                    .unwrap_or_default(),
            ),
            _ => FieldValue::Date(String::new()),
        },
        FieldKind::Amount => FieldValue::Number(parse_amount(cell)),
        FieldKind::Code => FieldValue::Code(parse_code(cell)),
        FieldKind::Text => FieldValue::Text(cell.to_text().trim().to_string()),
    }
}

/// Whether the document type / e-invoice type pair denotes an archive invoice
pub fn is_archive_invoice(document_type: i32, e_invoice_type: i32) -> bool {
    document_type == DOCUMENT_TYPE_E_ARCHIVE
        || (document_type == DOCUMENT_TYPE_E_INVOICE && e_invoice_type == E_INVOICE_TYPE_ARCHIVE)
}

/// Post-processing applied to every parsed record
///
/// The tax-free amount only applies to archive invoices and is zeroed for
/// every other document type.
pub fn apply_business_rules(record: &mut DraftRecord) {
    if !is_archive_invoice(record.document_type, record.e_invoice_type) {
        record.tax_free_amount = 0.0;
    }
}

/// Build a record from one data row
///
/// `columns` holds the resolved field of each column, `None` for headers that
/// are not in the mapping table. Cells under unrecognized headers (or past the
/// last header) go to the fallback field, but only when they carry a value.
pub fn build_record(columns: &[Option<CanonicalField>], row: &[RawCell]) -> DraftRecord {
    let mut record = DraftRecord::new();

    for (col_idx, cell) in row.iter().enumerate() {
        let field = match columns.get(col_idx).copied().flatten() {
            Some(field) => field,
            None if cell.is_empty() => continue,
            None => FALLBACK_FIELD,
        };

        let value = coerce_cell(field.kind(), cell);
        if let Err(e) = record.set(field, value) {
            log::debug!("Skipping cell in column {}: {}", col_idx + 1, e);
        }
    }

    apply_business_rules(&mut record);
    record
}

/// Map every data row of a grid to a draft record
///
/// Rows whose cells are all empty are skipped.
pub fn records_from_grid(grid: &RawCellGrid) -> Vec<DraftRecord> {
    let header = grid.header();
    let columns = resolve_columns(&header);

    grid.data_rows()
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| build_record(&columns, row))
        .collect()
}

fn resolve_columns(header: &[String]) -> Vec<Option<CanonicalField>> {
    header
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let field = mapping::lookup_header(text).map(|m| m.field);
            if field.is_none() && !text.is_empty() {
                log::warn!(
                    "Unrecognized header '{}' in column {}, mapping to '{}'",
                    text,
                    idx + 1,
                    FALLBACK_FIELD
                );
            }
            field
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn grid(header: &[&str], rows: Vec<Vec<RawCell>>) -> RawCellGrid {
        let mut all = vec![header.iter().map(|h| text(h)).collect::<Vec<_>>()];
        all.extend(rows);
        RawCellGrid::new(all)
    }

    #[test]
    fn test_date_shift_crosses_midnight() {
        assert_eq!(normalize_date(dt(2024, 1, 1, 21, 30)), "2024-01-02");
        assert_eq!(normalize_date(dt(2024, 1, 1, 20, 59)), "2024-01-01");
        assert_eq!(normalize_date(dt(2024, 3, 10, 0, 0)), "2024-03-10");
        assert_eq!(normalize_date(dt(2024, 12, 31, 23, 0)), "2025-01-01");
    }

    #[test]
    fn test_date_fields_only_accept_date_cells() {
        assert_eq!(
            coerce_cell(FieldKind::Date, &text("2024-03-10")),
            FieldValue::Date(String::new())
        );
        assert_eq!(
            coerce_cell(FieldKind::Date, &RawCell::Number(45361.0)),
            FieldValue::Date(String::new())
        );
        assert_eq!(
            coerce_cell(FieldKind::Date, &RawCell::Date(dt(2024, 3, 10, 0, 0))),
            FieldValue::Date("2024-03-10".to_string())
        );
    }

    #[test]
    fn test_non_numeric_amounts_become_zero() {
        for cell in [
            text("abc"),
            text(""),
            text("   "),
            text("NaN"),
            text("inf"),
            RawCell::Empty,
            RawCell::Date(dt(2024, 1, 1, 0, 0)),
        ] {
            assert_eq!(parse_amount(&cell), 0.0, "{:?}", cell);
        }
        assert_eq!(parse_amount(&text(" 1000 ")), 1000.0);
        assert_eq!(parse_amount(&text("12.75")), 12.75);
        assert_eq!(parse_amount(&RawCell::Number(99.5)), 99.5);
    }

    #[test]
    fn test_codes_parse_base_10() {
        assert_eq!(parse_code(&text("2")), 2);
        assert_eq!(parse_code(&text("07")), 7);
        assert_eq!(parse_code(&text("3.9")), 3);
        assert_eq!(parse_code(&RawCell::Number(4.0)), 4);
        assert_eq!(parse_code(&text("x")), 0);
        assert_eq!(parse_code(&RawCell::Empty), 0);
    }

    #[test]
    fn test_text_fields_render_numbers_and_default_to_empty() {
        assert_eq!(
            coerce_cell(FieldKind::Text, &RawCell::Number(11111111111.0)),
            FieldValue::Text("11111111111".into())
        );
        assert_eq!(
            coerce_cell(FieldKind::Text, &RawCell::Empty),
            FieldValue::Text(String::new())
        );
    }

    #[test]
    fn test_tax_free_amount_kept_only_for_archive_invoices() {
        let header = ["Tax Free Amount", "Document Type", "E-Invoice Type"];
        let rows = vec![
            vec![RawCell::Number(50.0), text("1"), text("2")],
            vec![RawCell::Number(50.0), text("2"), text("0")],
            vec![RawCell::Number(50.0), text("1"), text("1")],
            vec![RawCell::Number(50.0), text("3"), text("2")],
            vec![RawCell::Number(50.0), RawCell::Empty, RawCell::Empty],
        ];
        let records = records_from_grid(&grid(&header, rows));
        let tax_free: Vec<f64> = records.iter().map(|r| r.tax_free_amount).collect();
        assert_eq!(tax_free, vec![50.0, 50.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_one_row_with_every_header() {
        let header: Vec<&str> = mapping::FIELD_MAPPINGS.iter().map(|m| m.header_key).collect();
        let row: Vec<RawCell> = mapping::FIELD_MAPPINGS
            .iter()
            .map(|m| match m.field.kind() {
                FieldKind::Text => text(&format!("{} value", m.field.key())),
                FieldKind::Amount => RawCell::Number(10.0),
                FieldKind::Date => RawCell::Date(dt(2024, 6, 1, 0, 0)),
                FieldKind::Code => match m.field {
                    CanonicalField::DocumentType => RawCell::Number(2.0),
                    _ => RawCell::Number(5.0),
                },
            })
            .collect();

        let records = records_from_grid(&grid(&header, vec![row]));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        for field in CanonicalField::ALL {
            let expected = match field.kind() {
                FieldKind::Text => FieldValue::Text(format!("{} value", field.key())),
                FieldKind::Amount => FieldValue::Number(10.0),
                FieldKind::Date => FieldValue::Date("2024-06-01".into()),
                FieldKind::Code if field == CanonicalField::DocumentType => FieldValue::Code(2),
                FieldKind::Code => FieldValue::Code(5),
            };
            assert_eq!(record.get(field), expected, "{}", field);
        }
    }

    #[test]
    fn test_end_to_end_invoice_row() {
        let header = ["Invoice No", "Seller Tax Id", "Buyer Tax Id", "Original Amount", "Due Date"];
        let row = vec![
            text("INV-001"),
            text("11111111111"),
            text("22222222222"),
            text("1000"),
            RawCell::Date(dt(2024, 3, 10, 0, 0)),
        ];
        let records = records_from_grid(&grid(&header, vec![row]));
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.invoice_number, "INV-001");
        assert_eq!(r.sender_identifier, "11111111111");
        assert_eq!(r.receiver_identifier, "22222222222");
        assert_eq!(r.payable_amount, 1000.0);
        assert_eq!(r.payment_due_date, "2024-03-10");

        assert_eq!(r.approved_payable_amount, 0.0);
        assert_eq!(r.tax_free_amount, 0.0);
        assert_eq!(r.issue_date, "");
        assert_eq!(r.currency_code, "");
        assert_eq!(r.document_type, 0);
        assert_eq!(r.description, "");
    }

    #[test]
    fn test_unknown_headers_feed_fallback_field() {
        let header = ["Invoice No", "Warehouse"];
        let rows = vec![
            vec![text("A"), text("Dock 4")],
            vec![text("B"), RawCell::Empty],
        ];
        let records = records_from_grid(&grid(&header, rows));
        assert_eq!(records[0].description, "Dock 4");
        assert_eq!(records[1].description, "");
    }

    #[test]
    fn test_empty_unmapped_cells_do_not_clear_fallback() {
        let header = ["Description", "Warehouse"];
        let rows = vec![vec![text("keep me"), RawCell::Empty, RawCell::Empty]];
        let records = records_from_grid(&grid(&header, rows));
        assert_eq!(records[0].description, "keep me");
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let header = ["Invoice No"];
        let rows = vec![
            vec![text("A")],
            vec![RawCell::Empty],
            vec![text("  ")],
            vec![text("B")],
        ];
        let records = records_from_grid(&grid(&header, rows));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_untyped_cells_keep_source_text_in_text_fields() {
        let header = ["Invoice No", "Invoice Hash", "Description", "Original Amount", "Due Date"];
        let row = vec![
            RawCell::Untyped("1.10".into()),
            RawCell::Untyped("12345678901234567890".into()),
            RawCell::Untyped("2024-03-10T10:15:00".into()),
            RawCell::Untyped("1000.50".into()),
            RawCell::Untyped("2024-03-10T22:00:00".into()),
        ];
        let records = records_from_grid(&grid(&header, vec![row]));

        let r = &records[0];
        assert_eq!(r.invoice_number, "1.10");
        assert_eq!(r.invoice_hash, "12345678901234567890");
        assert_eq!(r.description, "2024-03-10T10:15:00");
        assert_eq!(r.payable_amount, 1000.5);
        assert_eq!(r.payment_due_date, "2024-03-11");
    }

    #[test]
    fn test_untyped_date_cells_need_iso_text() {
        assert_eq!(
            coerce_cell(FieldKind::Date, &RawCell::Untyped("2024-03-10".into())),
            FieldValue::Date("2024-03-10".into())
        );
        assert_eq!(
            coerce_cell(FieldKind::Date, &RawCell::Untyped("45361".into())),
            FieldValue::Date(String::new())
        );
        assert_eq!(parse_code(&RawCell::Untyped("07".into())), 7);
    }

    #[test]
    fn test_header_only_grid_yields_no_records() {
        assert!(records_from_grid(&grid(&["Invoice No"], vec![])).is_empty());
        assert!(records_from_grid(&RawCellGrid::default()).is_empty());
    }
}
