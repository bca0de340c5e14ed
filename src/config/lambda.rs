use crate::config::settings::{OutputFormat, Settings};
use crate::core::metrics::MetricsPolicy;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{AnalysisError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use aws_sdk_s3::Client as S3Client;
use std::env;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub settings: Settings,
    pub s3_bucket: String,
    pub s3_region: String,
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl LambdaConfig {
    /// Reads the deployment environment once, at cold start.
    ///
    /// `CONFIG_TOML` may hold a complete TOML document; the individual
    /// variables below override it.
    pub fn from_env() -> Result<Self> {
        let mut settings = match env::var("CONFIG_TOML") {
            Ok(toml) => Settings::from_toml_str(&toml)?,
            Err(_) => {
                let mut settings = Settings::default();
                settings.output.path = "startup-reports".to_string();
                settings
            }
        };

        if let Ok(key) = env::var("INPUT_KEY") {
            settings.input.path = key;
        }
        if let Ok(prefix) = env::var("OUTPUT_PREFIX") {
            settings.output.path = prefix;
        }
        if let Some(enabled) = env_flag("NARRATIVE_ENABLED") {
            settings.narrative.enabled = enabled;
        }
        if let Ok(endpoint) = env::var("NARRATIVE_ENDPOINT") {
            settings.narrative.endpoint = Some(endpoint);
        }
        if let Ok(deployment) = env::var("NARRATIVE_DEPLOYMENT") {
            settings.narrative.deployment = Some(deployment);
        }
        if let Ok(api_key) = env::var("NARRATIVE_API_KEY") {
            settings.narrative.api_key = Some(api_key);
        }
        if let Ok(concurrent) = env::var("CONCURRENT_REQUESTS") {
            settings.narrative.concurrent_requests = concurrent.parse().map_err(|_| {
                AnalysisError::InvalidConfigValueError {
                    field: "CONCURRENT_REQUESTS".to_string(),
                    value: concurrent.clone(),
                    reason: "must be a positive integer".to_string(),
                }
            })?;
        }

        Ok(Self {
            settings,
            s3_bucket: env::var("S3_BUCKET").map_err(|_| AnalysisError::MissingConfigError {
                field: "S3_BUCKET".to_string(),
            })?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "ap-southeast-2".to_string()),
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn input_path(&self) -> &str {
        self.settings.input_path()
    }

    fn output_path(&self) -> &str {
        self.settings.output_path()
    }

    fn output_basename(&self) -> &str {
        self.settings.output_basename()
    }

    fn output_formats(&self) -> &[OutputFormat] {
        self.settings.output_formats()
    }

    fn compress_output(&self) -> bool {
        self.settings.compress_output()
    }

    fn metrics_policy(&self) -> MetricsPolicy {
        self.settings.metrics_policy()
    }

    fn strict_margin_range(&self) -> bool {
        self.settings.strict_margin_range()
    }

    fn narrative_concurrency(&self) -> usize {
        self.settings.narrative_concurrency()
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        validate_s3_bucket_name("s3_bucket", &self.s3_bucket)?;
        validate_aws_region("s3_region", &self.s3_region)?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let reason = if bucket_name.len() < 3 || bucket_name.len() > 63 {
        Some("S3 bucket name must be between 3 and 63 characters")
    } else if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        Some("S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots")
    } else if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        Some("S3 bucket name cannot start or end with a hyphen")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AnalysisError::StorageError {
                message: format!(
                    "Failed to read s3://{}/{}: {}",
                    self.bucket,
                    path,
                    e.into_service_error()
                ),
            })?;

        let data = resp.body.collect().await.map_err(|e| AnalysisError::StorageError {
            message: format!("Failed to collect s3://{}/{}: {}", self.bucket, path, e),
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| AnalysisError::StorageError {
                message: format!(
                    "Failed to write s3://{}/{}: {}",
                    self.bucket,
                    path,
                    e.into_service_error()
                ),
            })?;

        tracing::debug!("Wrote {} bytes to s3://{}/{}", data.len(), self.bucket, path);
        Ok(())
    }
}
