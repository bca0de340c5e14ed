pub mod settings;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "lambda")]
pub mod lambda;

pub use settings::{InputSettings, NarrativeSettings, OutputFormat, OutputSettings, Settings};
