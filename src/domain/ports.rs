use crate::config::settings::OutputFormat;
use crate::core::metrics::MetricsPolicy;
use crate::domain::model::{Record, StartupInput, StartupReport, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_basename(&self) -> &str;
    fn output_formats(&self) -> &[OutputFormat];
    fn compress_output(&self) -> bool;
    fn metrics_policy(&self) -> MetricsPolicy;
    fn strict_margin_range(&self) -> bool;
    fn narrative_concurrency(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// Failure of the narrative collaborator. Advisory only: it never
/// invalidates a report that was already computed.
#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("narrative request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("narrative service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("narrative service returned no content")]
    EmptyResponse,

    #[error("could not encode report for the narrative service: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NarrativeError {
    /// Transport failures, throttling and server errors may clear up on a
    /// later attempt. Client errors and bad payloads will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            NarrativeError::Request(_) => true,
            NarrativeError::Status { status, .. } => *status == 429 || *status >= 500,
            NarrativeError::EmptyResponse | NarrativeError::Encode(_) => false,
        }
    }
}

/// Produces free-text commentary for one computed report.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn narrate(
        &self,
        input: &StartupInput,
        report: &StartupReport,
    ) -> std::result::Result<String, NarrativeError>;
}
