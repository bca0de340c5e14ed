pub mod batch;
pub mod codec;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod narrative;
pub mod pipeline;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, NarrativeService, Pipeline, Storage};
pub use crate::utils::error::Result;
