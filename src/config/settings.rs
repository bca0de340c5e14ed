use crate::core::metrics::MetricsPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::{AnalysisError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run needs, resolved once at startup and passed down
/// explicitly. Every section is optional in TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: InputSettings,
    pub metrics: MetricsPolicy,
    pub narrative: NarrativeSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub path: String,
    pub strict_margin_range: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            path: "startups.csv".to_string(),
            strict_margin_range: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeSettings {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    pub concurrent_requests: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            deployment: None,
            api_version: "2024-02-01".to_string(),
            api_key: None,
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
            concurrent_requests: 4,
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(AnalysisError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: other.to_string(),
                reason: "Supported formats are csv and json".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: String,
    pub formats: Vec<OutputFormat>,
    pub basename: String,
    pub compress: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            basename: "startup_report".to_string(),
            compress: false,
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| AnalysisError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable.
    /// Unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AnalysisError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_file_extension("input.path", &self.input.path, &["csv", "json"])?;

        let metrics = &self.metrics;
        validation::validate_positive_number(
            "metrics.horizon_months",
            metrics.horizon_months as usize,
            1,
        )?;
        validation::validate_positive_number(
            "metrics.horizon_years",
            metrics.horizon_years as usize,
            1,
        )?;
        // powi takes an i32 exponent
        validation::validate_range(
            "metrics.horizon_months",
            metrics.horizon_months,
            1,
            i32::MAX as u32,
        )?;
        validation::validate_finite("metrics.ratio_threshold", metrics.ratio_threshold)?;
        validation::validate_finite("metrics.cagr_threshold", metrics.cagr_threshold)?;
        validation::validate_range("metrics.margin_threshold", metrics.margin_threshold, 0.0, 1.0)?;

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_non_empty_string("output.basename", &self.output.basename)?;
        if self.output.formats.is_empty() {
            return Err(AnalysisError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: "[]".to_string(),
                reason: "At least one output format is required".to_string(),
            });
        }

        let narrative = &self.narrative;
        if narrative.enabled {
            let endpoint =
                validation::validate_required_field("narrative.endpoint", &narrative.endpoint)?;
            validation::validate_url("narrative.endpoint", endpoint)?;
            let deployment =
                validation::validate_required_field("narrative.deployment", &narrative.deployment)?;
            validation::validate_non_empty_string("narrative.deployment", deployment)?;
            let api_key =
                validation::validate_required_field("narrative.api_key", &narrative.api_key)?;
            if api_key.starts_with("${") {
                return Err(AnalysisError::MissingConfigError {
                    field: format!("narrative.api_key (unresolved {})", api_key),
                });
            }
            validation::validate_non_empty_string("narrative.api_version", &narrative.api_version)?;
            validation::validate_range(
                "narrative.concurrent_requests",
                narrative.concurrent_requests,
                1,
                64,
            )?;
            validation::validate_positive_number(
                "narrative.timeout_seconds",
                narrative.timeout_seconds as usize,
                1,
            )?;
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_basename(&self) -> &str {
        &self.output.basename
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.output.formats
    }

    fn compress_output(&self) -> bool {
        self.output.compress
    }

    fn metrics_policy(&self) -> MetricsPolicy {
        self.metrics
    }

    fn strict_margin_range(&self) -> bool {
        self.input.strict_margin_range
    }

    fn narrative_concurrency(&self) -> usize {
        self.narrative.concurrent_requests
    }
}
