//! Review grid: the editable in-memory record set
//!
//! Records keep their import order until sorted. Every edit goes through the
//! record's kind check, so the grid never holds a value of the wrong kind.

use uuid::Uuid;

use crate::import::mapping::{CanonicalField, FieldKind};
use crate::import::record::{DraftRecord, FieldValue, FieldValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Which records a date edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateEditScope {
    One(Uuid),
    All,
}

/// Result of deleting a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed { remaining: usize },
    /// The deleted record was the last one
    Emptied,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewError {
    RecordNotFound(Uuid),
    NotADateField(CanonicalField),
    Field(FieldValueError),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::RecordNotFound(id) => write!(f, "no record with id {}", id),
            ReviewError::NotADateField(field) => write!(f, "'{}' is not a date field", field),
            ReviewError::Field(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReviewError {}

impl From<FieldValueError> for ReviewError {
    fn from(e: FieldValueError) -> Self {
        ReviewError::Field(e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewGrid {
    records: Vec<DraftRecord>,
}

impl ReviewGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole record set
    pub fn replace(&mut self, records: Vec<DraftRecord>) {
        self.records = records;
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records in display order
    pub fn records(&self) -> &[DraftRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraftRecord> {
        self.records.iter()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&DraftRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Record at a display position
    pub fn at(&self, index: usize) -> Option<&DraftRecord> {
        self.records.get(index)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut DraftRecord, ReviewError> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ReviewError::RecordNotFound(id))
    }

    /// Set one field of one record
    pub fn set_field(
        &mut self,
        id: Uuid,
        field: CanonicalField,
        value: FieldValue,
    ) -> Result<(), ReviewError> {
        self.get_mut(id)?.set(field, value)?;
        Ok(())
    }

    /// Set an amount field from user input
    pub fn set_amount(
        &mut self,
        id: Uuid,
        field: CanonicalField,
        amount: f64,
    ) -> Result<(), ReviewError> {
        self.set_field(id, field, FieldValue::Number(amount))
    }

    /// Set a date field on one record or on every record
    ///
    /// `date` is `YYYY-MM-DD` or empty. With [`DateEditScope::All`] the value
    /// is checked once, then written to every record.
    pub fn edit_date(
        &mut self,
        field: CanonicalField,
        date: &str,
        scope: DateEditScope,
    ) -> Result<usize, ReviewError> {
        if field.kind() != FieldKind::Date {
            return Err(ReviewError::NotADateField(field));
        }
        let value = FieldValue::Date(date.to_string());

        match scope {
            DateEditScope::One(id) => {
                self.set_field(id, field, value)?;
                Ok(1)
            }
            DateEditScope::All => {
                // Validate against a scratch record so a bad date leaves the set untouched
                DraftRecord::new().set(field, value.clone())?;
                for record in &mut self.records {
                    record.set(field, value.clone())?;
                }
                log::debug!("Set {} on {} record(s)", field, self.records.len());
                Ok(self.records.len())
            }
        }
    }

    pub fn delete(&mut self, id: Uuid) -> Result<DeleteOutcome, ReviewError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(ReviewError::RecordNotFound(id))?;
        self.records.remove(index);

        if self.records.is_empty() {
            Ok(DeleteOutcome::Emptied)
        } else {
            Ok(DeleteOutcome::Removed {
                remaining: self.records.len(),
            })
        }
    }

    /// Stable sort by one field
    pub fn sort_by(&mut self, field: CanonicalField, direction: SortDirection) {
        self.records.sort_by(|a, b| {
            let ord = a.get(field).sort_cmp(&b.get(field));
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    /// Sum of payable amounts across the live set
    pub fn total_payable(&self) -> f64 {
        // Start at +0.0 so an empty set totals 0.00
        self.records
            .iter()
            .fold(0.0, |total, r| total + r.payable_amount)
    }

    pub fn missing_required(&self, id: Uuid) -> Result<Vec<CanonicalField>, ReviewError> {
        self.get(id)
            .map(DraftRecord::missing_required)
            .ok_or(ReviewError::RecordNotFound(id))
    }

    /// Ids of records with at least one required field still at its default
    pub fn incomplete(&self) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|r| !r.missing_required().is_empty())
            .map(|r| r.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: &str, amount: f64) -> DraftRecord {
        DraftRecord {
            invoice_number: number.to_string(),
            payable_amount: amount,
            ..DraftRecord::new()
        }
    }

    fn grid(records: Vec<DraftRecord>) -> ReviewGrid {
        let mut grid = ReviewGrid::new();
        grid.replace(records);
        grid
    }

    fn numbers(grid: &ReviewGrid) -> Vec<String> {
        grid.iter().map(|r| r.invoice_number.clone()).collect()
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut g = grid(vec![record("C", 3.0), record("A", 1.0), record("B", 2.0)]);
        g.sort_by(CanonicalField::InvoiceNumber, SortDirection::Ascending);
        let once = numbers(&g);
        g.sort_by(CanonicalField::InvoiceNumber, SortDirection::Ascending);
        assert_eq!(numbers(&g), once);
        assert_eq!(once, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_sort_amounts_numerically() {
        let mut g = grid(vec![record("x", 100.0), record("y", 9.5), record("z", 20.0)]);
        g.sort_by(CanonicalField::PayableAmount, SortDirection::Descending);
        let amounts: Vec<f64> = g.iter().map(|r| r.payable_amount).collect();
        assert_eq!(amounts, vec![100.0, 20.0, 9.5]);
    }

    #[test]
    fn test_sort_is_stable_and_empty_sorts_first() {
        let mut g = grid(vec![record("b", 1.0), record("", 2.0), record("b", 3.0)]);
        g.sort_by(CanonicalField::InvoiceNumber, SortDirection::Ascending);
        let amounts: Vec<f64> = g.iter().map(|r| r.payable_amount).collect();
        assert_eq!(amounts, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_apply_date_to_all_records() {
        let mut g = grid((0..5).map(|i| record(&i.to_string(), 1.0)).collect());
        let updated = g
            .edit_date(CanonicalField::PaymentDueDate, "2024-05-01", DateEditScope::All)
            .unwrap();
        assert_eq!(updated, 5);
        assert!(g.iter().all(|r| r.payment_due_date == "2024-05-01"));
    }

    #[test]
    fn test_apply_invalid_date_to_all_changes_nothing() {
        let mut g = grid(vec![record("A", 1.0), record("B", 1.0)]);
        let err = g
            .edit_date(CanonicalField::IssueDate, "01/05/2024", DateEditScope::All)
            .unwrap_err();
        assert!(matches!(err, ReviewError::Field(FieldValueError::InvalidDate { .. })));
        assert!(g.iter().all(|r| r.issue_date.is_empty()));
    }

    #[test]
    fn test_edit_one_date() {
        let mut g = grid(vec![record("A", 1.0), record("B", 1.0)]);
        let id = g.at(1).unwrap().id;
        g.edit_date(CanonicalField::IssueDate, "2024-02-29", DateEditScope::One(id))
            .unwrap();
        assert_eq!(g.at(0).unwrap().issue_date, "");
        assert_eq!(g.at(1).unwrap().issue_date, "2024-02-29");

        assert_eq!(
            g.edit_date(CanonicalField::PayableAmount, "2024-02-29", DateEditScope::All),
            Err(ReviewError::NotADateField(CanonicalField::PayableAmount))
        );
    }

    #[test]
    fn test_set_field_checks_kind() {
        let mut g = grid(vec![record("A", 1.0)]);
        let id = g.at(0).unwrap().id;

        g.set_field(id, CanonicalField::SenderName, FieldValue::Text("ACME".into()))
            .unwrap();
        g.set_amount(id, CanonicalField::ApprovedPayableAmount, 80.0).unwrap();
        assert_eq!(g.get(id).unwrap().sender_name, "ACME");
        assert_eq!(g.get(id).unwrap().approved_payable_amount, 80.0);

        let err = g
            .set_field(id, CanonicalField::PayableAmount, FieldValue::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Field(FieldValueError::KindMismatch { .. })));
    }

    #[test]
    fn test_delete_reports_empty_set() {
        let mut g = grid(vec![record("A", 10.0), record("B", 5.0)]);
        let first = g.at(0).unwrap().id;
        let second = g.at(1).unwrap().id;

        assert_eq!(g.delete(first), Ok(DeleteOutcome::Removed { remaining: 1 }));
        assert_eq!(g.total_payable(), 5.0);
        assert_eq!(g.delete(second), Ok(DeleteOutcome::Emptied));
        assert!(g.is_empty());
        assert_eq!(g.delete(second), Err(ReviewError::RecordNotFound(second)));
    }

    #[test]
    fn test_empty_total_is_positive_zero() {
        let grid = ReviewGrid::new();
        assert!(grid.total_payable().is_sign_positive());
        assert_eq!(format!("{:.2}", grid.total_payable()), "0.00");
    }

    #[test]
    fn test_aggregates_follow_live_set() {
        let mut g = grid(vec![record("A", 10.0), record("B", 2.5)]);
        assert_eq!(g.count(), 2);
        assert_eq!(g.total_payable(), 12.5);

        let id = g.at(0).unwrap().id;
        g.set_amount(id, CanonicalField::PayableAmount, 1.0).unwrap();
        assert_eq!(g.total_payable(), 3.5);
    }

    #[test]
    fn test_missing_required() {
        let mut complete = record("A", 10.0);
        complete.sender_identifier = "1".into();
        complete.receiver_identifier = "2".into();
        complete.payment_due_date = "2024-01-01".into();
        let g = grid(vec![complete, record("", 0.0)]);

        let ids: Vec<Uuid> = g.iter().map(|r| r.id).collect();
        assert!(g.missing_required(ids[0]).unwrap().is_empty());
        assert!(
            g.missing_required(ids[1])
                .unwrap()
                .contains(&CanonicalField::InvoiceNumber)
        );
        assert_eq!(g.incomplete(), vec![ids[1]]);
    }
}
