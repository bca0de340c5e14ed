use crate::config::settings::NarrativeSettings;
use crate::domain::model::{StartupInput, StartupReport};
use crate::domain::ports::{NarrativeError, NarrativeService};
use crate::utils::error::Result;
use crate::utils::retry::with_retry_if;
use crate::utils::validation::validate_required_field;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a venture capital analyst. Given a startup's inputs and computed \
metrics, write a short assessment (at most five sentences) of its growth prospects, unit economics \
and main risks. Do not restate every number.";

/// Narrative service backed by an Azure OpenAI chat-completions deployment.
#[derive(Debug, Clone)]
pub struct ChatNarrator {
    client: Client,
    url: String,
    api_version: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
    retry_attempts: usize,
    retry_delay_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct PromptPayload<'a> {
    input: &'a StartupInput,
    metrics: &'a StartupReport,
}

impl ChatNarrator {
    pub fn from_settings(settings: &NarrativeSettings) -> Result<Self> {
        let endpoint = validate_required_field("narrative.endpoint", &settings.endpoint)?;
        let deployment = validate_required_field("narrative.deployment", &settings.deployment)?;
        let api_key = validate_required_field("narrative.api_key", &settings.api_key)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/openai/deployments/{}/chat/completions",
                endpoint.trim_end_matches('/'),
                deployment
            ),
            api_version: settings.api_version.clone(),
            api_key: api_key.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            retry_attempts: settings.retry_attempts,
            retry_delay_ms: settings.retry_delay_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request_once(
        &self,
        body: &ChatRequest<'_>,
    ) -> std::result::Result<String, NarrativeError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Narrative response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(NarrativeError::EmptyResponse)
    }
}

#[async_trait::async_trait]
impl NarrativeService for ChatNarrator {
    async fn narrate(
        &self,
        input: &StartupInput,
        report: &StartupReport,
    ) -> std::result::Result<String, NarrativeError> {
        let payload = serde_json::to_string_pretty(&PromptPayload { input, metrics: report })?;
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Assess this startup:\n{}", payload),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        with_retry_if(
            || self.request_once(&body),
            NarrativeError::is_retryable,
            self.retry_attempts,
            self.retry_delay_ms,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Viability;
    use httpmock::prelude::*;

    fn settings(endpoint: String) -> NarrativeSettings {
        NarrativeSettings {
            enabled: true,
            endpoint: Some(endpoint),
            deployment: Some("gpt-4o".to_string()),
            api_key: Some("test-key".to_string()),
            retry_attempts: 1,
            retry_delay_ms: 1,
            ..NarrativeSettings::default()
        }
    }

    fn sample() -> (StartupInput, StartupReport) {
        (
            StartupInput {
                monthly_revenue: 10_000.0,
                expected_growth_rate_pct: 5.0,
                cac: 200.0,
                ltv: 1_000.0,
                gross_margin: 0.5,
            },
            StartupReport {
                projected_revenue_5y: 186_791.86,
                cagr: 0.7959,
                ltv_to_cac_ratio: 5.0,
                healthy_unit_economics: true,
                investment_viability: Viability::Good,
            },
        )
    }

    #[test]
    fn test_from_settings_requires_endpoint() {
        let mut s = settings("http://localhost".to_string());
        s.endpoint = None;
        assert!(ChatNarrator::from_settings(&s).is_err());
    }

    #[test]
    fn test_url_layout() {
        let endpoint = "https://acme.openai.azure.com/".to_string();
        let narrator = ChatNarrator::from_settings(&settings(endpoint)).unwrap();
        assert_eq!(
            narrator.url(),
            "https://acme.openai.azure.com/openai/deployments/gpt-4o/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_narrate_returns_first_choice() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/openai/deployments/gpt-4o/chat/completions")
                .query_param("api-version", "2024-02-01")
                .header("api-key", "test-key")
                .body_contains("Investment_Viability");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "  Strong growth.  "}}]
                }));
        });

        let narrator = ChatNarrator::from_settings(&settings(server.base_url())).unwrap();
        let (input, report) = sample();
        let text = narrator.narrate(&input, &report).await.unwrap();

        api_mock.assert();
        assert_eq!(text, "Strong growth.");
    }

    #[tokio::test]
    async fn test_narrate_retries_then_reports_status() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST);
            then.status(503).body("overloaded");
        });

        let narrator = ChatNarrator::from_settings(&settings(server.base_url())).unwrap();
        let (input, report) = sample();
        let err = narrator.narrate(&input, &report).await.unwrap_err();

        api_mock.assert_hits(2);
        match err {
            NarrativeError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_narrate_does_not_retry_client_errors() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST);
            then.status(401).body("invalid api key");
        });

        let narrator = ChatNarrator::from_settings(&settings(server.base_url())).unwrap();
        let (input, report) = sample();
        let err = narrator.narrate(&input, &report).await.unwrap_err();

        api_mock.assert_hits(1);
        assert!(matches!(err, NarrativeError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_narrate_empty_choices() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"choices": []}));
        });

        let mut s = settings(server.base_url());
        s.retry_attempts = 0;
        let narrator = ChatNarrator::from_settings(&s).unwrap();
        let (input, report) = sample();
        assert!(matches!(
            narrator.narrate(&input, &report).await,
            Err(NarrativeError::EmptyResponse)
        ));
    }
}
