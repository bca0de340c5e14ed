use crate::core::Pipeline;
use crate::domain::model::BatchSummary;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub output_path: String,
    pub summary: BatchSummary,
}

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("Starting startup assessment run");
        self.monitor.log_stats("Start");

        let records = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", records.len());
        self.monitor.log_stats("Extract");

        let transformed = self.pipeline.transform(records).await?;
        let summary = transformed.summary.clone();
        tracing::info!(
            "Assessed {}/{} startups ({} Good, {} Risky, {} failed)",
            summary.assessed,
            summary.total,
            summary.good,
            summary.risky,
            summary.failed
        );
        if summary.narrative_failures > 0 {
            tracing::warn!(
                "{} narratives could not be generated; numeric reports are unaffected",
                summary.narrative_failures
            );
        }
        self.monitor.log_stats("Transform");

        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Report saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(RunOutcome { output_path, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, TransformResult};
    use crate::domain::model::AssessedStartup;
    use crate::utils::error::AnalysisError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        fail_extract: bool,
        loaded: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Vec<Record>> {
            if self.fail_extract {
                return Err(AnalysisError::InputError {
                    message: "gone".to_string(),
                });
            }
            Ok(vec![Record::default(), Record::default()])
        }

        async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
            let results: Vec<AssessedStartup> = crate::core::batch::BatchRunner::default()
                .run_records(&data)
                .into_iter()
                .map(Into::into)
                .collect();
            Ok(TransformResult {
                summary: BatchSummary::from_results(&results),
                results,
                csv_output: String::new(),
                json_output: String::new(),
            })
        }

        async fn load(&self, _result: TransformResult) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok("out/startup_report.csv".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_reports_summary() {
        let engine = AnalysisEngine::new(StubPipeline {
            fail_extract: false,
            loaded: AtomicBool::new(false),
        });

        let outcome = engine.run().await.unwrap();

        assert_eq!(outcome.output_path, "out/startup_report.csv");
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.failed, 2);
        assert!(engine.pipeline().loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_stops_when_input_unreadable() {
        let engine = AnalysisEngine::new_with_monitoring(
            StubPipeline {
                fail_extract: true,
                loaded: AtomicBool::new(false),
            },
            false,
        );

        assert!(engine.run().await.is_err());
        assert!(!engine.pipeline().loaded.load(Ordering::SeqCst));
    }
}
