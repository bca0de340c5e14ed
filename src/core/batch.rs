use crate::core::ingest::{parse_startup, IngestRules};
use crate::core::metrics::MetricsEngine;
use crate::domain::model::{BatchEntry, Record, StartupInput};

/// Applies the metrics engine to every record independently.
///
/// Output is index-aligned with the input and always the same length: a
/// failing record gets an error entry and the batch carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner {
    engine: MetricsEngine,
    rules: IngestRules,
}

impl BatchRunner {
    pub fn new(engine: MetricsEngine, rules: IngestRules) -> Self {
        Self { engine, rules }
    }

    pub fn run_batch(&self, inputs: &[StartupInput]) -> Vec<BatchEntry> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| self.assess_one(index, *input))
            .collect()
    }

    /// Ingests and assesses raw records; malformed rows become error entries.
    pub fn run_records(&self, records: &[Record]) -> Vec<BatchEntry> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| match parse_startup(record, self.rules) {
                Ok(input) => self.assess_one(index, input),
                Err(err) => {
                    tracing::warn!("Row {} skipped: {}", index, err);
                    BatchEntry {
                        index,
                        input: None,
                        outcome: Err(err),
                    }
                }
            })
            .collect()
    }

    fn assess_one(&self, index: usize, input: StartupInput) -> BatchEntry {
        let outcome = self.engine.assess(&input).map_err(Into::into);
        if let Err(err) = &outcome {
            tracing::warn!("Row {} could not be assessed: {}", index, err);
        }
        BatchEntry {
            index,
            input: Some(input),
            outcome,
        }
    }
}
