use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use startup_metrics::utils::logger;
use startup_metrics::utils::validation::Validate;
use startup_metrics::{AnalysisEngine, AssessmentPipeline, ChatNarrator, LambdaConfig, S3Storage};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct Request {
    pub input_key: Option<String>,
    pub output_prefix: Option<String>,
    pub narrative: Option<bool>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub output_path: String,
    pub records_processed: usize,
    pub records_failed: usize,
    pub good: usize,
    pub risky: usize,
}

async fn function_handler(
    base: &LambdaConfig,
    s3_client: &S3Client,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    tracing::info!("Starting startup assessment Lambda function");

    // Per-invocation overrides on a copy of the cold-start configuration.
    let mut config = base.clone();
    if let Some(key) = event.payload.input_key {
        config.settings.input.path = key;
    }
    if let Some(prefix) = event.payload.output_prefix {
        config.settings.output.path = prefix;
    }
    if let Some(narrative) = event.payload.narrative {
        config.settings.narrative.enabled = narrative;
    }
    config.validate()?;

    let narrator = if config.settings.narrative.enabled {
        Some(ChatNarrator::from_settings(&config.settings.narrative)?)
    } else {
        None
    };

    let storage = S3Storage::new(s3_client.clone(), config.s3_bucket.clone());
    let mut pipeline = AssessmentPipeline::new(storage, config);
    if let Some(narrator) = narrator {
        pipeline = pipeline.with_narrator(Arc::new(narrator));
    }

    let outcome = AnalysisEngine::new(pipeline).run().await?;

    tracing::info!("Startup assessment Lambda function completed");
    Ok(Response {
        message: "Startup assessment completed".to_string(),
        output_path: outcome.output_path,
        records_processed: outcome.summary.total,
        records_failed: outcome.summary.failed,
        good: outcome.summary.good,
        risky: outcome.summary.risky,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .region(Region::new(config.s3_region.clone()))
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(s3_config);

    let config = &config;
    let s3_client = &s3_client;
    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(config, s3_client, event).await
    }))
    .await
}
