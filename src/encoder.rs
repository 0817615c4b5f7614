//! Report encoding
//!
//! This module encodes score tables into the output artifacts consumed by
//! downstream report, visualization and transport collaborators: a flat CSV
//! table, NDJSON records, and a JSON report with producer metadata.

use crate::assembler::ScoreTable;
use crate::error::PipelineError;
use crate::types::{FeatureTable, ScoreRecord, Summary};
use crate::{CRATE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Output table columns, in order
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "Chunk_Start_Frame",
    "Chunk_End_Frame",
    "Chunk_Start_Time",
    "Chunk_End_Time",
    "Frame",
    "Time_Seconds",
    "Deception_Score",
    "Binary_Prediction",
    "Confidence",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Parameters the report was computed with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportParameters {
    pub threshold: f64,
    pub fps: f64,
    pub window_size: usize,
    pub total_frames: usize,
    pub members: Vec<String>,
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub parameters: ReportParameters,
    pub summary: Option<Summary>,
    pub records: Vec<ScoreRecord>,
}

/// Report encoder for producing output artifacts
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the JSON report for a score table
    pub fn encode(&self, table: &ScoreTable, members: &[String]) -> ReportPayload {
        ReportPayload {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: CRATE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            parameters: ReportParameters {
                threshold: table.threshold,
                fps: table.fps,
                window_size: table.window_size,
                total_frames: table.total_frames,
                members: members.to_vec(),
            },
            summary: table.summary(),
            records: table.records.clone(),
        }
    }

    pub fn encode_to_json(&self, table: &ScoreTable, members: &[String]) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(&self.encode(table, members))?)
    }

    pub fn encode_to_json_pretty(
        &self,
        table: &ScoreTable,
        members: &[String],
    ) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(&self.encode(table, members))?)
    }
}

/// Encode the score table as CSV with the canonical output columns
pub fn table_to_csv(table: &ScoreTable) -> Result<String, PipelineError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if table.is_empty() {
        wtr.write_record(OUTPUT_COLUMNS)?;
    }
    for record in table {
        wtr.serialize(record)?;
    }
    into_string(wtr)
}

/// Encode one JSON object per record, newline-terminated
pub fn table_to_ndjson(table: &ScoreTable) -> Result<String, PipelineError> {
    let mut out = String::new();
    for record in table {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Encode a reconciled feature table as CSV with its canonical columns
pub fn feature_table_to_csv(table: &FeatureTable) -> Result<String, PipelineError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.schema().names())?;
    for row in table.rows() {
        wtr.write_record(row.values.iter().map(|v| v.to_string()))?;
    }
    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, PipelineError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| PipelineError::EncodingError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureSchema;
    use crate::types::FeatureRow;

    fn record(frame: usize, score: f64, label: u8) -> ScoreRecord {
        ScoreRecord {
            start_frame: frame - 15,
            end_frame: frame + 15,
            start_time: (frame - 15) as f64 / 30.0,
            end_time: (frame + 15) as f64 / 30.0,
            frame,
            time_seconds: frame as f64 / 30.0,
            deception_score: score,
            binary_prediction: label,
            confidence: 2.0 * (score - 0.5_f64).abs(),
        }
    }

    fn sample_table() -> ScoreTable {
        ScoreTable {
            records: vec![record(15, 0.25, 0), record(45, 0.75, 1)],
            total_frames: 60,
            window_size: 30,
            fps: 30.0,
            threshold: 0.5,
        }
    }

    fn empty_table() -> ScoreTable {
        ScoreTable {
            records: Vec::new(),
            total_frames: 0,
            window_size: 30,
            fps: 30.0,
            threshold: 0.5,
        }
    }

    #[test]
    fn test_csv_has_output_columns() {
        let csv = table_to_csv(&sample_table()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next().unwrap(), OUTPUT_COLUMNS.join(","));
        assert_eq!(lines.next().unwrap(), "0,30,0.0,1.0,15,0.5,0.25,0,0.5");
        assert_eq!(lines.clone().count(), 1);
    }

    #[test]
    fn test_csv_of_empty_table_has_header() {
        let csv = table_to_csv(&empty_table()).unwrap();
        assert_eq!(csv.trim_end(), OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_ndjson_one_record_per_line() {
        let ndjson = table_to_ndjson(&sample_table()).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["Frame"], 45);
        assert_eq!(value["Binary_Prediction"], 1);
    }

    #[test]
    fn test_json_report_structure() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let json = encoder
            .encode_to_json(&sample_table(), &["m0".to_string(), "m1".to_string()])
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["report_version"], REPORT_VERSION);
        assert_eq!(payload["producer"]["name"], PRODUCER_NAME);
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["parameters"]["members"][1], "m1");
        assert_eq!(payload["summary"]["window_count"], 2);
        assert_eq!(payload["records"].as_array().unwrap().len(), 2);
        assert!(payload["computed_at_utc"].as_str().is_some());
    }

    #[test]
    fn test_json_report_for_empty_table_has_null_summary() {
        let payload = ReportEncoder::new().encode(&empty_table(), &[]);
        assert!(payload.summary.is_none());
        assert!(payload.records.is_empty());
    }

    #[test]
    fn test_feature_table_csv() {
        let schema = FeatureSchema::from_names(["AU01_r", "AU02_c"]);
        let rows = vec![
            FeatureRow {
                values: vec![0.5, 1.0],
                chunk_id: 0,
            },
            FeatureRow {
                values: vec![0.0, 0.0],
                chunk_id: 1,
            },
        ];
        let table = FeatureTable::new(schema, rows, "sample").unwrap();

        let csv = feature_table_to_csv(&table).unwrap();
        assert_eq!(csv, "AU01_r,AU02_c\n0.5,1\n0,0\n");
    }
}
