//! HTTP analyzer implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use fieldscan_config::AnalyzerConfig;
use fieldscan_protocols::{AnalysisContext, AnalysisResult, Analyzer, AnalyzerError, WorkItem};

use crate::api::{AnalyzeRequest, AnalyzeResponse, error_message};

const ANALYZER_ID: &str = "http";

/// Analyzer that forwards image work items to a remote vision endpoint.
pub struct HttpAnalyzer {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpAnalyzer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(AnalyzerError::InvalidInput(
                "analyzer endpoint must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key,
            timeout,
            client,
        })
    }

    /// Build from the `[analyzer]` config section. An endpoint is required.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            AnalyzerError::InvalidInput("analyzer.endpoint is not configured".to_string())
        })?;
        Self::new(
            endpoint,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalyzerError {
        if e.is_timeout() {
            AnalyzerError::Timeout(self.timeout.as_secs())
        } else {
            AnalyzerError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    fn id(&self) -> &str {
        ANALYZER_ID
    }

    async fn process(
        &self,
        ctx: &AnalysisContext,
        item: &WorkItem,
    ) -> Result<AnalysisResult, AnalyzerError> {
        if !item.is_image() {
            return Err(AnalyzerError::InvalidInput(format!(
                "unsupported content type: {}",
                item.content_type
            )));
        }

        let body = AnalyzeRequest {
            entry_id: ctx.entry_id,
            attempt: ctx.attempt,
            work_item: item,
        };

        debug!(
            endpoint = %self.endpoint,
            work_item_id = %item.id,
            attempt = ctx.attempt,
            "Sending analysis request"
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Api {
                status,
                message: error_message(body),
            });
        }

        let parsed: AnalyzeResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalyzerError::Timeout(self.timeout.as_secs())
            } else {
                AnalyzerError::Failed(format!("invalid analyzer response: {e}"))
            }
        })?;

        Ok(parsed.into_result(&item.id, ANALYZER_ID))
    }
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
