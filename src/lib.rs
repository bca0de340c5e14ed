pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliArgs, LocalStorage};

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Storage};

pub use adapters::ChatNarrator;
pub use config::Settings;
pub use crate::core::{
    batch::BatchRunner,
    engine::{AnalysisEngine, RunOutcome},
    metrics::{MetricsEngine, MetricsPolicy},
    pipeline::AssessmentPipeline,
};
pub use domain::model::{
    BatchEntry, DomainError, RecordError, StartupInput, StartupReport, Viability,
};
pub use utils::error::{AnalysisError, Result};
