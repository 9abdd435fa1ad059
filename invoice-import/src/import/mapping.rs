//! Static field mappings for invoice spreadsheet imports
//!
//! This module defines the mapping from spreadsheet header text to canonical
//! invoice fields, together with the display metadata used by the review grid
//! and the import template.
//!
//! Headers that are not in the table do not abort an import: their values land
//! in [`FALLBACK_FIELD`].

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::str::FromStr;

/// Canonical invoice field, independent of spreadsheet header wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    InvoiceHash,
    InvoiceUuid,
    InvoiceNumber,
    SenderIdentifier,
    SenderName,
    ReceiverIdentifier,
    ReceiverName,
    PayableAmount,
    ApprovedPayableAmount,
    TaxFreeAmount,
    CurrencyCode,
    IssueDate,
    PaymentDueDate,
    DocumentType,
    EInvoiceType,
    ProfileId,
    Description,
}

/// How a field's raw cell value is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, defaults to ""
    Text,
    /// Monetary amount, non-numeric becomes 0
    Amount,
    /// ISO date (`YYYY-MM-DD`) or ""
    Date,
    /// Small integer classification code, non-numeric becomes 0
    Code,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Amount => write!(f, "amount"),
            FieldKind::Date => write!(f, "date"),
            FieldKind::Code => write!(f, "code"),
        }
    }
}

impl CanonicalField {
    /// Every canonical field, in table order
    pub const ALL: [CanonicalField; 17] = [
        CanonicalField::InvoiceHash,
        CanonicalField::InvoiceUuid,
        CanonicalField::InvoiceNumber,
        CanonicalField::SenderIdentifier,
        CanonicalField::SenderName,
        CanonicalField::ReceiverIdentifier,
        CanonicalField::ReceiverName,
        CanonicalField::PayableAmount,
        CanonicalField::ApprovedPayableAmount,
        CanonicalField::TaxFreeAmount,
        CanonicalField::CurrencyCode,
        CanonicalField::IssueDate,
        CanonicalField::PaymentDueDate,
        CanonicalField::DocumentType,
        CanonicalField::EInvoiceType,
        CanonicalField::ProfileId,
        CanonicalField::Description,
    ];

    /// Stable key used in requests and on the command line
    pub fn key(self) -> &'static str {
        match self {
            CanonicalField::InvoiceHash => "invoiceHash",
            CanonicalField::InvoiceUuid => "invoiceUuid",
            CanonicalField::InvoiceNumber => "invoiceNumber",
            CanonicalField::SenderIdentifier => "senderIdentifier",
            CanonicalField::SenderName => "senderName",
            CanonicalField::ReceiverIdentifier => "receiverIdentifier",
            CanonicalField::ReceiverName => "receiverName",
            CanonicalField::PayableAmount => "payableAmount",
            CanonicalField::ApprovedPayableAmount => "approvedPayableAmount",
            CanonicalField::TaxFreeAmount => "taxFreeAmount",
            CanonicalField::CurrencyCode => "currencyCode",
            CanonicalField::IssueDate => "issueDate",
            CanonicalField::PaymentDueDate => "paymentDueDate",
            CanonicalField::DocumentType => "documentType",
            CanonicalField::EInvoiceType => "eInvoiceType",
            CanonicalField::ProfileId => "profileId",
            CanonicalField::Description => "description",
        }
    }

    /// Look up a field by its canonical key (case-insensitive)
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalField::PayableAmount
            | CanonicalField::ApprovedPayableAmount
            | CanonicalField::TaxFreeAmount => FieldKind::Amount,
            CanonicalField::IssueDate | CanonicalField::PaymentDueDate => FieldKind::Date,
            CanonicalField::DocumentType
            | CanonicalField::EInvoiceType
            | CanonicalField::ProfileId => FieldKind::Code,
            _ => FieldKind::Text,
        }
    }

    /// Mapping entry for this field
    pub fn mapping(self) -> Option<&'static FieldMapping> {
        FIELD_LOOKUP.get(&self).copied()
    }

    /// Label shown in grid headers, falls back to the canonical key
    pub fn label(self) -> &'static str {
        self.mapping()
            .map(|m| m.display_label)
            .unwrap_or_else(|| self.key())
    }

    pub fn is_required(self) -> bool {
        self.mapping().map(|m| m.required).unwrap_or(false)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|f| f.key()).collect();
            format!("unknown field '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}

/// Single mapping from a spreadsheet header to a canonical field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// Header text as it appears in row 1 of the spreadsheet
    pub header_key: &'static str,
    pub field: CanonicalField,
    /// Must carry a non-default value before submission
    pub required: bool,
    /// Shown as a review grid column
    pub displayable: bool,
    pub display_label: &'static str,
    /// Column width in the import template (Excel character units)
    pub column_width: Option<f64>,
}

/// Field that receives values from unrecognized headers
pub const FALLBACK_FIELD: CanonicalField = CanonicalField::Description;

/// The header vocabulary of the import template
pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    FieldMapping {
        header_key: "Invoice Hash",
        field: CanonicalField::InvoiceHash,
        required: false,
        displayable: false,
        display_label: "Hash",
        column_width: Some(24.0),
    },
    FieldMapping {
        header_key: "Invoice UUID",
        field: CanonicalField::InvoiceUuid,
        required: false,
        displayable: false,
        display_label: "UUID",
        column_width: Some(38.0),
    },
    FieldMapping {
        header_key: "Invoice No",
        field: CanonicalField::InvoiceNumber,
        required: true,
        displayable: true,
        display_label: "Invoice Number",
        column_width: Some(20.0),
    },
    FieldMapping {
        header_key: "Seller Tax Id",
        field: CanonicalField::SenderIdentifier,
        required: true,
        displayable: true,
        display_label: "Seller Tax Id",
        column_width: Some(16.0),
    },
    FieldMapping {
        header_key: "Seller Name",
        field: CanonicalField::SenderName,
        required: false,
        displayable: true,
        display_label: "Seller",
        column_width: Some(30.0),
    },
    FieldMapping {
        header_key: "Buyer Tax Id",
        field: CanonicalField::ReceiverIdentifier,
        required: true,
        displayable: true,
        display_label: "Buyer Tax Id",
        column_width: Some(16.0),
    },
    FieldMapping {
        header_key: "Buyer Name",
        field: CanonicalField::ReceiverName,
        required: false,
        displayable: true,
        display_label: "Buyer",
        column_width: Some(30.0),
    },
    FieldMapping {
        header_key: "Original Amount",
        field: CanonicalField::PayableAmount,
        required: true,
        displayable: true,
        display_label: "Amount",
        column_width: Some(16.0),
    },
    FieldMapping {
        header_key: "Approved Amount",
        field: CanonicalField::ApprovedPayableAmount,
        required: false,
        displayable: true,
        display_label: "Approved",
        column_width: Some(16.0),
    },
    FieldMapping {
        header_key: "Tax Free Amount",
        field: CanonicalField::TaxFreeAmount,
        required: false,
        displayable: true,
        display_label: "Tax Free",
        column_width: Some(16.0),
    },
    FieldMapping {
        header_key: "Currency",
        field: CanonicalField::CurrencyCode,
        required: false,
        displayable: true,
        display_label: "Cur",
        column_width: Some(10.0),
    },
    FieldMapping {
        header_key: "Issue Date",
        field: CanonicalField::IssueDate,
        required: false,
        displayable: true,
        display_label: "Issued",
        column_width: Some(14.0),
    },
    FieldMapping {
        header_key: "Due Date",
        field: CanonicalField::PaymentDueDate,
        required: true,
        displayable: true,
        display_label: "Due",
        column_width: Some(14.0),
    },
    FieldMapping {
        header_key: "Document Type",
        field: CanonicalField::DocumentType,
        required: false,
        displayable: false,
        display_label: "Doc Type",
        column_width: Some(14.0),
    },
    FieldMapping {
        header_key: "E-Invoice Type",
        field: CanonicalField::EInvoiceType,
        required: false,
        displayable: false,
        display_label: "E-Invoice Type",
        column_width: Some(14.0),
    },
    FieldMapping {
        header_key: "Profile",
        field: CanonicalField::ProfileId,
        required: false,
        displayable: false,
        display_label: "Profile",
        column_width: None,
    },
    FieldMapping {
        header_key: "Description",
        field: CanonicalField::Description,
        required: false,
        displayable: true,
        display_label: "Description",
        column_width: Some(40.0),
    },
];

static HEADER_LOOKUP: Lazy<HashMap<String, &'static FieldMapping>> = Lazy::new(|| {
    FIELD_MAPPINGS
        .iter()
        .map(|m| (normalize_header(m.header_key), m))
        .collect()
});

static FIELD_LOOKUP: Lazy<HashMap<CanonicalField, &'static FieldMapping>> =
    Lazy::new(|| FIELD_MAPPINGS.iter().map(|m| (m.field, m)).collect());

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Find the mapping entry for a header, if the header is part of the vocabulary
pub fn lookup_header(header: &str) -> Option<&'static FieldMapping> {
    HEADER_LOOKUP.get(&normalize_header(header)).copied()
}

/// Resolve a header to its canonical field, using [`FALLBACK_FIELD`] for unknown headers
pub fn field_for_header(header: &str) -> CanonicalField {
    lookup_header(header)
        .map(|m| m.field)
        .unwrap_or(FALLBACK_FIELD)
}

/// Fields that must be filled before submission
pub fn required_fields() -> impl Iterator<Item = CanonicalField> {
    FIELD_MAPPINGS.iter().filter(|m| m.required).map(|m| m.field)
}

/// Mapping entries shown as review grid columns, in table order
pub fn displayable_mappings() -> impl Iterator<Item = &'static FieldMapping> {
    FIELD_MAPPINGS.iter().filter(|m| m.displayable)
}
