//! Metrics worker client
//!
//! Attaches a `MetricBundle` to every candidate of a batch. The work can run
//! in-process (`LocalMetricsWorker`) or on a remote deployment of this
//! service (`HttpMetricsWorker`, speaking to `POST /identify-duplicates`).
//! Either way a batch succeeds or fails as a unit: callers never see a
//! partially scored batch.

use crate::matching::score;
use crate::types::{Candidate, MetricBundle, ScoredCandidate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("rta-screen/", env!("CARGO_PKG_VERSION"));

/// Metrics worker errors
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Worker returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Worker reported failure: {0}")]
    Rejected(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Worker returned {returned} results for {sent} candidates")]
    ShapeMismatch { sent: usize, returned: usize },

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Computes metrics for a batch of candidates against one target
#[async_trait]
pub trait MetricsWorker: Send + Sync {
    /// Worker name for logging
    fn name(&self) -> &'static str;

    /// Score every candidate against `target`
    ///
    /// # Errors
    /// Fails the whole batch if any candidate cannot be scored.
    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError>;
}

/// Score candidates synchronously, preserving input order
pub fn score_candidates(target: &str, candidates: Vec<Candidate>) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| ScoredCandidate {
            metrics: score(target, &candidate.response),
            target: target.to_string(),
            candidate,
        })
        .collect()
}

// ============================================================================
// Local worker
// ============================================================================

/// Computes metrics on the blocking thread pool
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMetricsWorker;

#[async_trait]
impl MetricsWorker for LocalMetricsWorker {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        let target = target.to_string();
        // O(n*m) per pair; keep it off the async workers
        tokio::task::spawn_blocking(move || score_candidates(&target, candidates))
            .await
            .map_err(|e| WorkerError::Task(e.to_string()))
    }
}

// ============================================================================
// Remote worker
// ============================================================================

/// Request body for `POST /identify-duplicates`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyRequest {
    pub s1: String,
    pub responses: Vec<Candidate>,
}

/// One scored candidate as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub s1: String,
    pub s2: String,
    pub nlev: f64,
    pub rlev: usize,
    pub nlcs: f64,
    pub rlcs: usize,
}

impl From<ScoredCandidate> for WireScoredCandidate {
    fn from(scored: ScoredCandidate) -> Self {
        Self {
            s2: scored.candidate.response.clone(),
            candidate: scored.candidate,
            s1: scored.target,
            nlev: scored.metrics.norm_lev,
            rlev: scored.metrics.raw_lev,
            nlcs: scored.metrics.norm_lcs,
            rlcs: scored.metrics.raw_lcs,
        }
    }
}

impl From<WireScoredCandidate> for ScoredCandidate {
    fn from(wire: WireScoredCandidate) -> Self {
        Self {
            target: wire.s1,
            candidate: Candidate {
                response: wire.s2,
                ..wire.candidate
            },
            metrics: MetricBundle {
                raw_lev: wire.rlev,
                norm_lev: wire.nlev,
                raw_lcs: wire.rlcs,
                norm_lcs: wire.nlcs,
            },
        }
    }
}

/// Response body of `POST /identify-duplicates`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub error: bool,
    #[serde(
        rename = "responsesWithMetrics",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub responses_with_metrics: Option<Vec<WireScoredCandidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Delegates metric computation to a remote worker over HTTP
pub struct HttpMetricsWorker {
    http_client: reqwest::Client,
    url: String,
}

impl HttpMetricsWorker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WorkerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MetricsWorker for HttpMetricsWorker {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        let sent = candidates.len();
        let body = IdentifyRequest {
            s1: target.to_string(),
            responses: candidates,
        };

        tracing::debug!(url = %self.url, candidates = sent, "Calling remote metrics worker");

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkerError::Status(status.as_u16(), text));
        }

        let parsed: IdentifyResponse = response
            .json()
            .await
            .map_err(|e| WorkerError::Parse(e.to_string()))?;

        if parsed.error {
            return Err(WorkerError::Rejected(
                parsed.problem.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let scored = parsed
            .responses_with_metrics
            .ok_or_else(|| WorkerError::Parse("missing responsesWithMetrics".to_string()))?;

        if scored.len() != sent {
            return Err(WorkerError::ShapeMismatch {
                sent,
                returned: scored.len(),
            });
        }

        // Lengths are judged against our own target, not the echoed `s1`
        Ok(scored
            .into_iter()
            .map(|wire| ScoredCandidate {
                target: target.to_string(),
                ..ScoredCandidate::from(wire)
            })
            .collect())
    }
}
