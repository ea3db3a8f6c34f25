//! Concurrent worker fanout.
//!
//! One request per candidate, each with its own timeout, collected until
//! every request settled or the aggregate deadline fired. Requests still
//! running at the deadline are aborted and their answers never read.

use crate::content::protocol::{BODY_LIMIT, ENDPOINT_WORKER_FIND, build_url};
use crate::content::types::ContentResponse;
use crate::discovery::types::RegistryEntry;

use anyhow::{Result, bail};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
pub const CANDIDATE_BUDGET: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Bound on a single worker request.
    pub request_timeout: Duration,
    /// Share of the aggregate deadline granted per candidate.
    pub candidate_budget: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
            candidate_budget: CANDIDATE_BUDGET,
        }
    }
}

impl FanoutConfig {
    pub fn deadline(&self, candidates: usize) -> Duration {
        let count = u32::try_from(candidates).unwrap_or(u32::MAX);
        self.candidate_budget
            .checked_mul(count)
            .unwrap_or(Duration::MAX)
    }
}

/// Sends `query` to every candidate and returns the answers that arrived in time.
///
/// Failed or late workers are logged and left out; the order of the result
/// follows arrival, not `candidates`.
pub async fn fan_out(
    client: &reqwest::Client,
    candidates: &[RegistryEntry],
    query: &str,
    config: &FanoutConfig,
) -> Vec<ContentResponse> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let deadline = Instant::now() + config.deadline(candidates.len());
    let mut requests = JoinSet::new();

    for entry in candidates {
        let worker = &entry.announcement;
        let url = build_url(&worker.http_host, &worker.http_port, ENDPOINT_WORKER_FIND, query);
        let name = worker.name.clone();
        let client = client.clone();
        let timeout = config.request_timeout;

        requests.spawn(async move {
            let answer = fetch(&client, &url, timeout).await;
            (name, answer)
        });
    }

    let mut responses = Vec::with_capacity(candidates.len());
    loop {
        let next = tokio::time::timeout_at(deadline, requests.join_next()).await;
        match next {
            Ok(Some(Ok((_, Ok(response))))) => responses.push(response),
            Ok(Some(Ok((name, Err(e))))) => {
                tracing::warn!("Worker {} did not answer: {:#}", name, e);
            }
            Ok(Some(Err(e))) => {
                tracing::error!("Fanout request task failed: {}", e);
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    "Fanout deadline reached, abandoning {} requests",
                    requests.len()
                );
                break;
            }
        }
    }

    responses
}

async fn fetch(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<ContentResponse> {
    let mut response = client.get(url).timeout(timeout).send().await?;

    if response.status() != StatusCode::OK {
        bail!("unexpected status {}", response.status());
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        bail!("answer is not json");
    }

    if response.content_length().is_some_and(|len| len > BODY_LIMIT as u64) {
        bail!("answer exceeds {} bytes", BODY_LIMIT);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > BODY_LIMIT {
            bail!("answer exceeds {} bytes", BODY_LIMIT);
        }
        body.extend_from_slice(&chunk);
    }

    Ok(serde_json::from_slice(&body)?)
}
