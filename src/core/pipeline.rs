use crate::config::settings::OutputFormat;
use crate::core::batch::BatchRunner;
use crate::core::codec;
use crate::core::ingest::{parse_startup, IngestRules};
use crate::core::metrics::MetricsEngine;
use crate::core::narrative::annotate;
use crate::core::{ConfigProvider, NarrativeService, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{AssessedStartup, BatchSummary};
use crate::utils::error::Result;
use std::io::Write;
use std::sync::Arc;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Reads startups from storage, assesses them and writes the report back.
pub struct AssessmentPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    narrator: Option<Arc<dyn NarrativeService>>,
}

/// What a dry run found in the input, without computing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct DryRunReport {
    pub total: usize,
    pub well_formed: usize,
    pub malformed: Vec<(usize, String)>,
}

impl<S: Storage, C: ConfigProvider> AssessmentPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeService>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    fn runner(&self) -> BatchRunner {
        BatchRunner::new(
            MetricsEngine::new(self.config.metrics_policy()),
            IngestRules {
                strict_margin_range: self.config.strict_margin_range(),
            },
        )
    }

    fn output_key(&self, file_name: &str) -> String {
        let prefix = self.config.output_path().trim_end_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }

    pub async fn dry_run(&self) -> Result<DryRunReport> {
        let records = self.extract().await?;
        let rules = IngestRules {
            strict_margin_range: self.config.strict_margin_range(),
        };

        let malformed: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                parse_startup(record, rules)
                    .err()
                    .map(|err| (index, err.to_string()))
            })
            .collect();

        Ok(DryRunReport {
            total: records.len(),
            well_formed: records.len() - malformed.len(),
            malformed,
        })
    }

    fn encode(&self, format: OutputFormat, result: &TransformResult) -> (String, Vec<u8>) {
        let name = format!("{}.{}", self.config.output_basename(), format.extension());
        let body = match format {
            OutputFormat::Csv => result.csv_output.as_bytes().to_vec(),
            OutputFormat::Json => result.json_output.as_bytes().to_vec(),
        };
        (name, body)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AssessmentPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let path = self.config.input_path();
        tracing::info!("📥 Reading startups from: {}", path);

        let bytes = self.storage.read_file(path).await?;
        let records = codec::decode_input(path, &bytes)?;

        tracing::debug!("Read {} bytes, {} records", bytes.len(), records.len());
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let policy = self.config.metrics_policy();
        let entries = self.runner().run_records(&data);

        let results: Vec<AssessedStartup> = match &self.narrator {
            Some(narrator) => {
                tracing::info!(
                    "🧠 Requesting narratives ({} concurrent)",
                    self.config.narrative_concurrency()
                );
                annotate(entries, Arc::clone(narrator), self.config.narrative_concurrency()).await
            }
            None => entries.into_iter().map(Into::into).collect(),
        };

        let summary = BatchSummary::from_results(&results);
        let csv_output = codec::encode_csv(&data, &results)?;
        let json_output = codec::encode_json(&results, &summary, &policy)?;

        Ok(TransformResult {
            results,
            summary,
            csv_output,
            json_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let files: Vec<(String, Vec<u8>)> = self
            .config
            .output_formats()
            .iter()
            .map(|format| self.encode(*format, &result))
            .collect();

        if self.config.compress_output() {
            let archive_name = format!("{}.zip", self.config.output_basename());
            tracing::debug!("Creating ZIP archive with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, body) in &files {
                    zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                    zip.write_all(body)?;
                }
                zip.finish()?.into_inner()
            };

            let key = self.output_key(&archive_name);
            self.storage.write_file(&key, &zip_data).await?;
            tracing::debug!("ZIP archive ({} bytes) saved", zip_data.len());
            return Ok(key);
        }

        let mut written = Vec::with_capacity(files.len());
        for (name, body) in &files {
            let key = self.output_key(name);
            self.storage.write_file(&key, body).await?;
            tracing::debug!("Wrote {} ({} bytes)", key, body.len());
            written.push(key);
        }

        Ok(written.join(", "))
    }
}
