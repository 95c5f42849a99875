use async_trait::async_trait;
use futures::StreamExt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use super::stream::{LineBuffer, StreamEventParser};
use super::types::{ChatRequest, QueryResult};
use crate::baseline::BaselineConfig;

const CHAT_PATH: &str = "/api/chat";
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request to pipeline failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("pipeline returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response stream broke: {0}")]
    Stream(String),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

/// Anything that can answer one question under one configuration.
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    async fn query(&self, question: &str, config: &BaselineConfig)
        -> Result<QueryResult, QueryError>;
}

pub struct PipelineClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PipelineClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to build HTTP client for pipeline")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn stream_query(
        &self,
        question: &str,
        config: &BaselineConfig,
    ) -> Result<QueryResult, QueryError> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let started_at = Instant::now();

        debug!(url = %url, baseline = %config.key, "Sending pipeline request");

        let resp = self
            .client
            .post(&url)
            .json(&ChatRequest::new(question, config))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let mut parser = StreamEventParser::new(started_at);
        let mut lines = LineBuffer::new();
        let mut body = resp.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| QueryError::Stream(e.to_string()))?;
            for line in lines.push(&chunk) {
                parser.feed_line(&line);
            }
        }
        if let Some(line) = lines.flush() {
            parser.feed_line(&line);
        }

        let result = parser.finish();
        info!(
            baseline = %config.key,
            stages = result.stage_latencies.len(),
            tokens = result.tokens,
            latency_ms = %format!("{:.0}", result.total_latency_ms),
            "Pipeline query completed"
        );
        debug!(
            staged_ms = %format!("{:.0}", result.stage_latency_sum()),
            unstaged_ms = %format!("{:.0}", result.total_latency_ms - result.stage_latency_sum()),
            "Stage timing breakdown"
        );
        Ok(result)
    }
}

#[async_trait]
impl PipelineBackend for PipelineClient {
    async fn query(
        &self,
        question: &str,
        config: &BaselineConfig,
    ) -> Result<QueryResult, QueryError> {
        match tokio::time::timeout(self.timeout, self.stream_query(question, config)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }
}
