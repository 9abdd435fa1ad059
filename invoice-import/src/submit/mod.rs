//! Submission of reviewed records to the create-invoices service

pub mod client;
pub mod request;

pub use client::{HttpInvoiceApi, InvoiceApi};
pub use request::{CreateInvoiceRequest, build_request, build_requests};

use anyhow::{Result, bail};

use crate::config::SubmissionConfig;
use crate::import::record::DraftRecord;

/// Summary of a successful batch submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub total_payable: f64,
    /// Records sent with at least one required field still empty
    pub incomplete: usize,
}

/// Submit every record as one batch
///
/// Either the whole batch is accepted or the call fails; there is no
/// per-record outcome.
pub async fn submit_records(
    api: &dyn InvoiceApi,
    records: &[DraftRecord],
    config: &SubmissionConfig,
) -> Result<SubmissionReport> {
    if records.is_empty() {
        bail!("Nothing to submit: the record set is empty");
    }

    // Each missing field is logged while the requests are built
    let incomplete = records
        .iter()
        .filter(|r| !r.missing_required().is_empty())
        .count();

    let requests = build_requests(records, &config.base_currency);
    api.create_invoices(&requests).await?;

    let report = SubmissionReport {
        submitted: requests.len(),
        total_payable: records.iter().fold(0.0, |total, r| total + r.payable_amount),
        incomplete,
    };
    log::info!(
        "Submitted {} invoice(s), total payable {:.2}",
        report.submitted,
        report.total_payable
    );
    Ok(report)
}
