use crate::config::settings::{OutputFormat, Settings};
use crate::core::Storage;
use crate::utils::error::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "startup-metrics")]
#[command(about = "Computes growth and unit-economics metrics for a batch of startups")]
pub struct CliArgs {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input collection (.csv or .json)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory the report files are written to
    #[arg(short, long)]
    pub output_path: Option<String>,

    /// Output format; repeat for several (csv, json)
    #[arg(long = "format")]
    pub formats: Vec<OutputFormat>,

    /// Bundle the report files into a single zip archive
    #[arg(long)]
    pub compress: bool,

    /// Accept gross margins outside [0, 1]
    #[arg(long)]
    pub lenient_margin: bool,

    /// Request an AI narrative for every assessed startup
    #[arg(long)]
    pub narrative: bool,

    #[arg(long, env = "NARRATIVE_ENDPOINT")]
    pub narrative_endpoint: Option<String>,

    #[arg(long, env = "NARRATIVE_DEPLOYMENT")]
    pub narrative_deployment: Option<String>,

    #[arg(long, env = "NARRATIVE_API_KEY", hide_env_values = true)]
    pub narrative_api_key: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    /// Validate configuration and input without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Loads the TOML file (if any) and applies command-line overrides.
    pub fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        if let Some(input) = &self.input {
            settings.input.path = input.clone();
        }
        if self.lenient_margin {
            settings.input.strict_margin_range = false;
        }
        if let Some(output_path) = &self.output_path {
            settings.output.path = output_path.clone();
        }
        if !self.formats.is_empty() {
            settings.output.formats = self.formats.clone();
        }
        if self.compress {
            settings.output.compress = true;
        }

        let narrative = &mut settings.narrative;
        if self.narrative {
            narrative.enabled = true;
        }
        if let Some(endpoint) = &self.narrative_endpoint {
            narrative.endpoint = Some(endpoint.clone());
        }
        if let Some(deployment) = &self.narrative_deployment {
            narrative.deployment = Some(deployment.clone());
        }
        if let Some(api_key) = &self.narrative_api_key {
            narrative.api_key = Some(api_key.clone());
        }

        Ok(settings)
    }
}

/// Filesystem storage; keys are paths relative to `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(Path::new(path))
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}
