//! Create-invoices API client

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;

use super::request::CreateInvoiceRequest;
use crate::config::SubmissionConfig;

/// Downstream service that creates invoices from a batch of requests
///
/// The batch succeeds or fails as a whole.
#[async_trait]
pub trait InvoiceApi: Send + Sync {
    async fn create_invoices(&self, requests: &[CreateInvoiceRequest]) -> Result<()>;
}

/// Posts the batch as one JSON array
pub struct HttpInvoiceApi {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpInvoiceApi {
    pub fn new(endpoint: impl Into<String>, api_token: Option<String>, config: &SubmissionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token,
        })
    }

    /// Build from configuration; fails when no endpoint is configured
    pub fn from_config(config: &SubmissionConfig) -> Result<Self> {
        let Some(endpoint) = config.endpoint.clone() else {
            bail!(
                "No submission endpoint configured (set {} or [submission].endpoint)",
                crate::config::ENV_API_URL
            );
        };
        Self::new(endpoint, config.api_token.clone(), config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InvoiceApi for HttpInvoiceApi {
    async fn create_invoices(&self, requests: &[CreateInvoiceRequest]) -> Result<()> {
        log::debug!("POST {} with {} invoice(s)", self.endpoint, requests.len());

        let mut request = self.client.post(&self.endpoint).json(requests);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Create invoices failed with HTTP {}: {}", status, body.trim());
        }

        Ok(())
    }
}
