//! Scoring Invoker: boundary to the external valuation pipeline.
//!
//! The pipeline resolves a subject, runs its analysis and stores the evidence
//! artifact. From this side it is one call that either yields a complete
//! [`ValuationResult`] or fails as a whole.

use crate::error::ValuationError;
use crate::task::ValuationResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait ScoringInvoker: Send + Sync {
    async fn invoke(&self, subject: &str) -> Result<ValuationResult, ValuationError>;
}

#[derive(Debug, Serialize)]
struct ScoringRequest<'a> {
    subject: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoringResponse {
    score: Option<f64>,
    evidence_uri: Option<String>,
    display_name: Option<String>,
}

const BODY_PREVIEW_MAX_LEN: usize = 200;

/// Validates a pipeline payload. Partial payloads are rejected outright.
fn validate_response(raw: ScoringResponse) -> Result<ValuationResult, ValuationError> {
    let score = raw
        .score
        .ok_or_else(|| ValuationError::Malformed("missing `score`".to_string()))?;
    if !score.is_finite() || score < 0.0 {
        return Err(ValuationError::Malformed(format!(
            "score must be a finite non-negative number, got {score}"
        )));
    }
    // `u128::MAX as f64` rounds up to 2^128, which itself does not fit.
    if score.round() >= u128::MAX as f64 {
        return Err(ValuationError::Malformed(format!(
            "score {score} does not fit the on-chain score type"
        )));
    }
    let evidence_uri = raw
        .evidence_uri
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValuationError::Malformed("missing `evidenceUri`".to_string()))?;
    let display_name = raw.display_name.unwrap_or_default().trim().to_string();
    Ok(ValuationResult {
        score,
        evidence_uri,
        display_name,
    })
}

pub struct HttpScoringInvoker {
    url: String,
    client: Client,
}

impl HttpScoringInvoker {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, ValuationError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ValuationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl ScoringInvoker for HttpScoringInvoker {
    async fn invoke(&self, subject: &str) -> Result<ValuationResult, ValuationError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ScoringRequest { subject })
            .send()
            .await
            .map_err(|e| ValuationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ValuationError::Rejected {
                subject: subject.to_string(),
                status: status.as_u16(),
                body: crate::utils::error::compact_error_message(&body, BODY_PREVIEW_MAX_LEN),
            });
        }

        let raw: ScoringResponse = resp
            .json()
            .await
            .map_err(|e| ValuationError::Malformed(e.to_string()))?;
        let result = validate_response(raw)?;
        tracing::debug!(
            "[SCORE] subject={} score={} evidence={}",
            subject,
            result.score,
            result.evidence_uri
        );
        Ok(result)
    }
}
