//! Turns loosely typed [`Record`]s into [`StartupInput`]s.
//!
//! Shape problems (missing or non-numeric cells) are caught here, before
//! anything reaches the metrics engine.

use crate::domain::model::{fields, Record, RecordError, StartupInput};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestRules {
    /// Reject gross margins outside [0, 1]; catches percentages such as `40`.
    pub strict_margin_range: bool,
}

impl Default for IngestRules {
    fn default() -> Self {
        Self {
            strict_margin_range: true,
        }
    }
}

fn malformed(field: &str, reason: impl Into<String>) -> RecordError {
    RecordError::Malformed {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn numeric_field(record: &Record, field: &str) -> Result<f64, RecordError> {
    let value = match record.get(field) {
        None | Some(Value::Null) => return Err(malformed(field, "is missing")),
        Some(value) => value,
    };

    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| malformed(field, format!("is not representable as a number: {}", n)))?,
        Value::String(s) if s.trim().is_empty() => return Err(malformed(field, "is missing")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| malformed(field, format!("is not numeric: {:?}", s)))?,
        other => return Err(malformed(field, format!("is not numeric: {}", other))),
    };

    if !number.is_finite() {
        return Err(malformed(field, format!("is not a finite number: {}", number)));
    }
    Ok(number)
}

pub fn parse_startup(record: &Record, rules: IngestRules) -> Result<StartupInput, RecordError> {
    let input = StartupInput {
        monthly_revenue: numeric_field(record, fields::MONTHLY_REVENUE)?,
        expected_growth_rate_pct: numeric_field(record, fields::EXPECTED_GROWTH_RATE)?,
        cac: numeric_field(record, fields::CAC)?,
        ltv: numeric_field(record, fields::LTV)?,
        gross_margin: numeric_field(record, fields::GROSS_MARGIN)?,
    };

    if rules.strict_margin_range && !(0.0..=1.0).contains(&input.gross_margin) {
        let hint = if input.gross_margin > 1.0 && input.gross_margin <= 100.0 {
            format!(
                "must be a fraction in [0, 1], got {} (did you mean {}?)",
                input.gross_margin,
                input.gross_margin / 100.0
            )
        } else {
            format!("must be a fraction in [0, 1], got {}", input.gross_margin)
        };
        return Err(malformed(fields::GROSS_MARGIN, hint));
    }

    Ok(input)
}
