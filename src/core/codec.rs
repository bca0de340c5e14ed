//! Reading the input collection and rendering the output collection.

use crate::core::metrics::MetricsPolicy;
use crate::domain::model::{fields, AssessedStartup, BatchSummary, Record, StartupReport};
use crate::utils::error::{AnalysisError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

pub const CSV_HEADER: [&str; 14] = [
    "Row",
    fields::MONTHLY_REVENUE,
    fields::EXPECTED_GROWTH_RATE,
    fields::CAC,
    fields::LTV,
    fields::GROSS_MARGIN,
    fields::PROJECTED_REVENUE,
    fields::CAGR,
    fields::LTV_TO_CAC_RATIO,
    fields::HEALTHY_UNIT_ECONOMICS,
    fields::INVESTMENT_VIABILITY,
    fields::AI_FEEDBACK,
    "Status",
    "Error",
];

/// Decodes the input collection, picking the format from the file extension.
pub fn decode_input(path: &str, bytes: &[u8]) -> Result<Vec<Record>> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => decode_csv(bytes),
        Some("json") => decode_json(bytes),
        other => Err(AnalysisError::InputError {
            message: format!("unsupported input format {:?} for '{}'", other.unwrap_or(""), path),
        }),
    }
}

pub fn decode_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    // Cells that are not valid UTF-8 are decoded lossily so the row keeps its
    // position and later fails numeric parsing on its own.
    for (index, row) in reader.byte_records().enumerate() {
        let row = row?;
        let data: HashMap<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| {
                let text = match std::str::from_utf8(cell) {
                    Ok(text) => text.to_string(),
                    Err(_) => {
                        tracing::warn!("Row {}: column '{}' is not valid UTF-8", index, header);
                        String::from_utf8_lossy(cell).into_owned()
                    }
                };
                (header.to_string(), Value::String(text))
            })
            .collect();
        records.push(Record { data });
    }

    tracing::debug!("Decoded {} CSV rows", records.len());
    Ok(records)
}

pub fn decode_json(bytes: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("records") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AnalysisError::InputError {
                    message: "expected a JSON array or an object with a \"records\" array"
                        .to_string(),
                })
            }
        },
        _ => {
            return Err(AnalysisError::InputError {
                message: "expected a JSON array of objects".to_string(),
            })
        }
    };

    // Non-object elements keep their position as empty (malformed) records.
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(obj) => Record {
                data: obj.into_iter().collect(),
            },
            _ => Record::default(),
        })
        .collect())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One CSV row per input record, in input order.
pub fn encode_csv(records: &[Record], results: &[AssessedStartup]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for result in results {
        let entry = &result.entry;
        let raw = records.get(entry.index);

        let mut row: Vec<String> = Vec::with_capacity(CSV_HEADER.len());
        row.push(entry.index.to_string());
        for field in fields::INPUT_FIELDS {
            row.push(cell(raw.and_then(|r| r.get(field))));
        }

        match &entry.outcome {
            Ok(report) => {
                row.push(report.projected_revenue_5y.to_string());
                row.push(report.cagr.to_string());
                row.push(report.ltv_to_cac_ratio.to_string());
                row.push(report.healthy_unit_economics.to_string());
                row.push(report.investment_viability.to_string());
                row.push(result.ai_feedback.clone().unwrap_or_default());
                row.push("ok".to_string());
                row.push(result.narrative_error.clone().unwrap_or_default());
            }
            Err(err) => {
                row.extend(std::iter::repeat(String::new()).take(6));
                row.push("error".to_string());
                row.push(err.to_string());
            }
        }

        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| AnalysisError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::InputError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    generated_at: String,
    policy: &'a MetricsPolicy,
    summary: &'a BatchSummary,
    results: Vec<JsonResult<'a>>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    index: usize,
    status: &'static str,
    #[serde(flatten)]
    report: Option<&'a StartupReport>,
    #[serde(rename = "AI_Feedback", skip_serializing_if = "Option::is_none")]
    ai_feedback: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    narrative_error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn encode_json(
    results: &[AssessedStartup],
    summary: &BatchSummary,
    policy: &MetricsPolicy,
) -> Result<String> {
    let document = JsonDocument {
        generated_at: chrono::Utc::now().to_rfc3339(),
        policy,
        summary,
        results: results
            .iter()
            .map(|result| {
                let outcome = &result.entry.outcome;
                JsonResult {
                    index: result.entry.index,
                    status: if outcome.is_ok() { "ok" } else { "error" },
                    report: outcome.as_ref().ok(),
                    ai_feedback: result.ai_feedback.as_deref(),
                    narrative_error: result.narrative_error.as_deref(),
                    error_kind: outcome.as_ref().err().map(|e| e.kind()),
                    error: outcome.as_ref().err().map(|e| e.to_string()),
                }
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::BatchRunner;
    use crate::domain::model::RecordError;

    const SAMPLE_CSV: &str = "\
Monthly_Revenue, Expected_Growth_Rate ,CAC,LTV,Gross_Margin
10000,5,200,1000,0.5
5000,1,500,800,0.3
0,10,100,500,0.6
8000,-2,300
";

    fn assess(records: &[Record]) -> Vec<AssessedStartup> {
        BatchRunner::default()
            .run_records(records)
            .into_iter()
            .map(Into::into)
            .collect()
    }

    #[test]
    fn test_decode_csv_trims_headers_and_keeps_short_rows() {
        let records = decode_input("startups.csv", SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].get("Expected_Growth_Rate"), Some(&Value::String("5".to_string())));
        assert!(records[3].get("LTV").is_none());
    }

    #[test]
    fn test_decode_csv_keeps_rows_with_invalid_utf8() {
        let mut bytes = b"Monthly_Revenue,Expected_Growth_Rate,CAC,LTV,Gross_Margin\n".to_vec();
        bytes.extend_from_slice(b"10000,5,200,1000,0.5\n");
        bytes.extend_from_slice(b"5000,1,500,\xff\xfe,0.3\n");
        bytes.extend_from_slice(b"8000,-2,300,1200,0.45\n");

        let records = decode_csv(&bytes).unwrap();
        assert_eq!(records.len(), 3);

        let results = assess(&records);
        assert_eq!(results.len(), 3);
        assert!(results[0].entry.outcome.is_ok());
        assert!(matches!(
            &results[1].entry.outcome,
            Err(RecordError::Malformed { field, .. }) if field == "LTV"
        ));
        assert_eq!(results[1].entry.index, 1);
        assert!(results[2].entry.outcome.is_ok());
    }

    #[test]
    fn test_decode_json_shapes() {
        let array = br#"[{"Monthly_Revenue": 1}, 42]"#;
        let records = decode_input("in.JSON", array).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].data.is_empty());

        let wrapped = br#"{"records": [{"CAC": 5}]}"#;
        assert_eq!(decode_json(wrapped).unwrap().len(), 1);

        assert!(decode_json(br#"{"rows": []}"#).is_err());
        assert!(decode_json(b"not json").is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_extension() {
        let err = decode_input("startups.xlsx", b"").unwrap_err();
        assert!(matches!(err, AnalysisError::InputError { .. }));
    }

    #[test]
    fn test_encode_csv_layout() {
        let records = decode_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let results = assess(&records);
        let csv = encode_csv(&records, &results).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].starts_with("0,10000,5,200,1000,0.5,"));
        assert!(lines[1].contains(",5,true,Good,,ok,"));
        assert!(lines[2].contains(",false,Risky,,ok,"));
        assert!(lines[3].starts_with("2,0,10,100,500,0.6,,,,,,,error,"));
        assert!(lines[4].starts_with("3,8000,-2,300,,,"));
        assert!(lines[4].contains("LTV"));
    }

    #[test]
    fn test_encode_json_layout() {
        let records = decode_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let mut results = assess(&records);
        results[0].ai_feedback = Some("Strong growth".to_string());
        let summary = BatchSummary::from_results(&results);

        let json = encode_json(&results, &summary, &MetricsPolicy::default()).unwrap();
        let doc: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(doc["summary"]["total"], 4);
        assert_eq!(doc["summary"]["failed"], 2);
        assert_eq!(doc["policy"]["horizon_months"], 60);

        let first = &doc["results"][0];
        assert_eq!(first["status"], "ok");
        assert_eq!(first["Investment_Viability"], "Good");
        assert_eq!(first["AI_Feedback"], "Strong growth");
        assert!(first.get("error").is_none());

        let second = &doc["results"][1];
        assert!(second.get("AI_Feedback").is_none());

        let failed = &doc["results"][2];
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["error_kind"], "domain");
        assert!(failed.get("CAGR").is_none());
    }
}
