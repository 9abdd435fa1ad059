//! Create-invoice request payloads

use serde::{Deserialize, Serialize};

use crate::import::record::DraftRecord;

/// One element of the batch sent to the create-invoices endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
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
    /// Approved amount when set, otherwise the payable amount
    pub remaining_amount: f64,
    pub currency_code: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payment_due_date: Option<String>,
    pub document_type: i32,
    pub e_invoice_type: i32,
    pub profile_id: i32,
    pub description: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Map a reviewed record to its request, filling defaults
///
/// The record's session id is not part of the request.
pub fn build_request(record: &DraftRecord, base_currency: &str) -> CreateInvoiceRequest {
    for field in record.missing_required() {
        log::warn!(
            "Create payload missing required field: {} (invoice '{}')",
            field,
            record.invoice_number
        );
    }

    let remaining_amount = if record.approved_payable_amount != 0.0 {
        record.approved_payable_amount
    } else {
        record.payable_amount
    };

    CreateInvoiceRequest {
        invoice_hash: record.invoice_hash.clone(),
        invoice_uuid: record.invoice_uuid.clone(),
        invoice_number: record.invoice_number.clone(),
        sender_identifier: record.sender_identifier.clone(),
        sender_name: record.sender_name.clone(),
        receiver_identifier: record.receiver_identifier.clone(),
        receiver_name: record.receiver_name.clone(),
        payable_amount: record.payable_amount,
        approved_payable_amount: record.approved_payable_amount,
        tax_free_amount: record.tax_free_amount,
        remaining_amount,
        currency_code: non_empty(&record.currency_code).unwrap_or_else(|| base_currency.to_string()),
        issue_date: non_empty(&record.issue_date),
        payment_due_date: non_empty(&record.payment_due_date),
        document_type: record.document_type,
        e_invoice_type: record.e_invoice_type,
        profile_id: record.profile_id,
        description: record.description.clone(),
    }
}

pub fn build_requests(records: &[DraftRecord], base_currency: &str) -> Vec<CreateInvoiceRequest> {
    records
        .iter()
        .map(|r| build_request(r, base_currency))
        .collect()
}
