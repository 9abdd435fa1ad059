//! Draft invoice records produced by a spreadsheet import

use chrono::NaiveDate;
use std::cmp::Ordering;
use uuid::Uuid;

use super::mapping::{CanonicalField, FieldKind};

/// Format used for every date field value
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A typed value held by one field of a [`DraftRecord`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// `YYYY-MM-DD` or empty
    Date(String),
    Code(i32),
}

impl FieldValue {
    /// Default value for a field kind ("" or 0)
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Amount => FieldValue::Number(0.0),
            FieldKind::Date => FieldValue::Date(String::new()),
            FieldKind::Code => FieldValue::Code(0),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Number(_) => FieldKind::Amount,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Code(_) => FieldKind::Code,
        }
    }

    /// Whether this is the kind's default value
    pub fn is_default(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => s.is_empty(),
            FieldValue::Number(n) => *n == 0.0,
            FieldValue::Code(c) => *c == 0,
        }
    }

    /// Ordering used by the review grid sort
    ///
    /// Numbers and codes compare numerically; everything else compares as
    /// text, with empty values sorting like the empty string.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Code(a), FieldValue::Code(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Code(c) => write!(f, "{}", c),
        }
    }
}

/// Error raised when a value does not fit a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValueError {
    KindMismatch {
        field: CanonicalField,
        expected: FieldKind,
        found: FieldKind,
    },
    InvalidDate {
        field: CanonicalField,
        value: String,
    },
    NotANumber {
        field: CanonicalField,
    },
}

impl std::fmt::Display for FieldValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValueError::KindMismatch {
                field,
                expected,
                found,
            } => write!(f, "field '{}' expects a {} value, got {}", field, expected, found),
            FieldValueError::InvalidDate { field, value } => write!(
                f,
                "field '{}' expects a YYYY-MM-DD date, got '{}'",
                field, value
            ),
            FieldValueError::NotANumber { field } => {
                write!(f, "field '{}' must be a finite number", field)
            }
        }
    }
}

impl std::error::Error for FieldValueError {}

/// One parsed spreadsheet row, with a value for every canonical field
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    /// Session-local identifier for edit/delete correlation, never submitted
    pub id: Uuid,
    pub invoice_hash: String,
    pub invoice_uuid: String,
    pub invoice_number: String,
    pub sender_identifier: String,
    pub sender_name: String,
    pub receiver_identifier: String,
    pub receiver_name: String,
    pub payable_amount: f64,
    pub approved_payable_amount: f64,
    pub tax_free_amount: f64,
    pub currency_code: String,
    pub issue_date: String,
    pub payment_due_date: String,
    pub document_type: i32,
    pub e_invoice_type: i32,
    pub profile_id: i32,
    pub description: String,
}

impl Default for DraftRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_hash: String::new(),
            invoice_uuid: String::new(),
            invoice_number: String::new(),
            sender_identifier: String::new(),
            sender_name: String::new(),
            receiver_identifier: String::new(),
            receiver_name: String::new(),
            payable_amount: 0.0,
            approved_payable_amount: 0.0,
            tax_free_amount: 0.0,
            currency_code: String::new(),
            issue_date: String::new(),
            payment_due_date: String::new(),
            document_type: 0,
            e_invoice_type: 0,
            profile_id: 0,
            description: String::new(),
        }
    }
}

impl DraftRecord {
    /// Create a record with every field at its default and a fresh id
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> FieldValue {
        match field {
            CanonicalField::InvoiceHash => FieldValue::Text(self.invoice_hash.clone()),
            CanonicalField::InvoiceUuid => FieldValue::Text(self.invoice_uuid.clone()),
            CanonicalField::InvoiceNumber => FieldValue::Text(self.invoice_number.clone()),
            CanonicalField::SenderIdentifier => FieldValue::Text(self.sender_identifier.clone()),
            CanonicalField::SenderName => FieldValue::Text(self.sender_name.clone()),
            CanonicalField::ReceiverIdentifier => {
                FieldValue::Text(self.receiver_identifier.clone())
            }
            CanonicalField::ReceiverName => FieldValue::Text(self.receiver_name.clone()),
            CanonicalField::PayableAmount => FieldValue::Number(self.payable_amount),
            CanonicalField::ApprovedPayableAmount => {
                FieldValue::Number(self.approved_payable_amount)
            }
            CanonicalField::TaxFreeAmount => FieldValue::Number(self.tax_free_amount),
            CanonicalField::CurrencyCode => FieldValue::Text(self.currency_code.clone()),
            CanonicalField::IssueDate => FieldValue::Date(self.issue_date.clone()),
            CanonicalField::PaymentDueDate => FieldValue::Date(self.payment_due_date.clone()),
            CanonicalField::DocumentType => FieldValue::Code(self.document_type),
            CanonicalField::EInvoiceType => FieldValue::Code(self.e_invoice_type),
            CanonicalField::ProfileId => FieldValue::Code(self.profile_id),
            CanonicalField::Description => FieldValue::Text(self.description.clone()),
        }
    }

    /// Replace one field's value, checking it against the field's kind
    pub fn set(&mut self, field: CanonicalField, value: FieldValue) -> Result<(), FieldValueError> {
        let expected = field.kind();
        if value.kind() != expected {
            return Err(FieldValueError::KindMismatch {
                field,
                expected,
                found: value.kind(),
            });
        }

        match value {
            FieldValue::Text(s) => *self.text_slot(field) = s,
            FieldValue::Date(s) => {
                let s = s.trim().to_string();
                if !s.is_empty() && NaiveDate::parse_from_str(&s, DATE_FORMAT).is_err() {
                    return Err(FieldValueError::InvalidDate { field, value: s });
                }
                *self.text_slot(field) = s;
            }
            FieldValue::Number(n) => {
                if !n.is_finite() {
                    return Err(FieldValueError::NotANumber { field });
                }
                match field {
                    CanonicalField::PayableAmount => self.payable_amount = n,
                    CanonicalField::ApprovedPayableAmount => self.approved_payable_amount = n,
                    _ => self.tax_free_amount = n,
                }
            }
            FieldValue::Code(c) => match field {
                CanonicalField::DocumentType => self.document_type = c,
                CanonicalField::EInvoiceType => self.e_invoice_type = c,
                _ => self.profile_id = c,
            },
        }
        Ok(())
    }

    // Only called after the kind check, so non-text fields never reach here.
    fn text_slot(&mut self, field: CanonicalField) -> &mut String {
        match field {
            CanonicalField::InvoiceHash => &mut self.invoice_hash,
            CanonicalField::InvoiceUuid => &mut self.invoice_uuid,
            CanonicalField::InvoiceNumber => &mut self.invoice_number,
            CanonicalField::SenderIdentifier => &mut self.sender_identifier,
            CanonicalField::SenderName => &mut self.sender_name,
            CanonicalField::ReceiverIdentifier => &mut self.receiver_identifier,
            CanonicalField::ReceiverName => &mut self.receiver_name,
            CanonicalField::CurrencyCode => &mut self.currency_code,
            CanonicalField::IssueDate => &mut self.issue_date,
            CanonicalField::PaymentDueDate => &mut self.payment_due_date,
            _ => &mut self.description,
        }
    }

    /// Required fields still holding their default value
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        super::mapping::required_fields()
            .filter(|f| self.get(*f).is_default())
            .collect()
    }
}
