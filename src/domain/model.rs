use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One row of the input collection, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }
}

/// Column names of the input and output record shapes.
pub mod fields {
    pub const MONTHLY_REVENUE: &str = "Monthly_Revenue";
    pub const EXPECTED_GROWTH_RATE: &str = "Expected_Growth_Rate";
    pub const CAC: &str = "CAC";
    pub const LTV: &str = "LTV";
    pub const GROSS_MARGIN: &str = "Gross_Margin";

    pub const INPUT_FIELDS: [&str; 5] =
        [MONTHLY_REVENUE, EXPECTED_GROWTH_RATE, CAC, LTV, GROSS_MARGIN];

    pub const PROJECTED_REVENUE: &str = "Projected_Revenue_5_Years";
    pub const CAGR: &str = "CAGR";
    pub const LTV_TO_CAC_RATIO: &str = "LTV_to_CAC_Ratio";
    pub const HEALTHY_UNIT_ECONOMICS: &str = "Healthy_Unit_Economics";
    pub const INVESTMENT_VIABILITY: &str = "Investment_Viability";
    pub const AI_FEEDBACK: &str = "AI_Feedback";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartupInput {
    pub monthly_revenue: f64,
    /// Percent per month, e.g. `5.0` for 5%.
    pub expected_growth_rate_pct: f64,
    pub cac: f64,
    pub ltv: f64,
    /// Fraction in [0, 1], not a percentage.
    pub gross_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Viability {
    Good,
    Risky,
}

impl std::fmt::Display for Viability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Viability::Good => write!(f, "Good"),
            Viability::Risky => write!(f, "Risky"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartupReport {
    #[serde(rename = "Projected_Revenue_5_Years")]
    pub projected_revenue_5y: f64,
    #[serde(rename = "CAGR")]
    pub cagr: f64,
    #[serde(rename = "LTV_to_CAC_Ratio")]
    pub ltv_to_cac_ratio: f64,
    #[serde(rename = "Healthy_Unit_Economics")]
    pub healthy_unit_economics: bool,
    #[serde(rename = "Investment_Viability")]
    pub investment_viability: Viability,
}

/// A record is well-formed but a formula precondition does not hold.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("CAGR is undefined for a non-positive start value ({start})")]
    NonPositiveStart { start: f64 },

    #[error("CAGR is undefined: end {end} over start {start} is a negative multiple")]
    NegativeGrowthBase { start: f64, end: f64 },

    #[error("{what} is not a finite number ({value})")]
    NonFinite { what: &'static str, value: f64 },

    #[error("CAGR is undefined over a zero-year horizon")]
    ZeroHorizon,
}

/// Why a single record could not be turned into a report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("malformed record: field '{field}' {reason}")]
    Malformed { field: String, reason: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RecordError {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Malformed { .. } => "malformed",
            RecordError::Domain(_) => "domain",
        }
    }
}

/// Batch runner output for one input position.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub index: usize,
    pub input: Option<StartupInput>,
    pub outcome: Result<StartupReport, RecordError>,
}

/// A batch entry after the optional narrative stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessedStartup {
    pub entry: BatchEntry,
    pub ai_feedback: Option<String>,
    pub narrative_error: Option<String>,
}

impl From<BatchEntry> for AssessedStartup {
    fn from(entry: BatchEntry) -> Self {
        Self {
            entry,
            ai_feedback: None,
            narrative_error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub assessed: usize,
    pub failed: usize,
    pub good: usize,
    pub risky: usize,
    pub narrated: usize,
    pub narrative_failures: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[AssessedStartup]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            match &result.entry.outcome {
                Ok(report) => {
                    summary.assessed += 1;
                    match report.investment_viability {
                        Viability::Good => summary.good += 1,
                        Viability::Risky => summary.risky += 1,
                    }
                }
                Err(_) => summary.failed += 1,
            }
            if result.ai_feedback.is_some() {
                summary.narrated += 1;
            }
            if result.narrative_error.is_some() {
                summary.narrative_failures += 1;
            }
        }

        summary
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub results: Vec<AssessedStartup>,
    pub summary: BatchSummary,
    pub csv_output: String,
    pub json_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, outcome: Result<StartupReport, RecordError>) -> AssessedStartup {
        BatchEntry {
            index,
            input: None,
            outcome,
        }
        .into()
    }

    #[test]
    fn test_summary_counts() {
        let good = StartupReport {
            projected_revenue_5y: 1.0,
            cagr: 0.5,
            ltv_to_cac_ratio: 4.0,
            healthy_unit_economics: true,
            investment_viability: Viability::Good,
        };
        let risky = StartupReport {
            investment_viability: Viability::Risky,
            ..good
        };
        let mut narrated = entry(1, Ok(risky));
        narrated.ai_feedback = Some("Solid".to_string());

        let results = vec![
            entry(0, Ok(good)),
            narrated,
            entry(
                2,
                Err(DomainError::NonPositiveStart { start: 0.0 }.into()),
            ),
        ];

        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.assessed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.good, 1);
        assert_eq!(summary.risky, 1);
        assert_eq!(summary.narrated, 1);
    }

    #[test]
    fn test_report_serializes_with_output_field_names() {
        let report = StartupReport {
            projected_revenue_5y: 2.0,
            cagr: 0.1,
            ltv_to_cac_ratio: 0.0,
            healthy_unit_economics: false,
            investment_viability: Viability::Risky,
        };
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value[fields::INVESTMENT_VIABILITY], "Risky");
        assert_eq!(value[fields::HEALTHY_UNIT_ECONOMICS], false);
        assert!(value.get(fields::PROJECTED_REVENUE).is_some());
    }
}
