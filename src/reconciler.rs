//! Feature table reconciliation
//!
//! This module merges the per-chunk tables emitted by the AU extractor into a
//! single canonical feature matrix:
//! - Tables are concatenated in chunk order, rows kept in table order
//! - Column names are trimmed before matching
//! - Canonical features absent from a table are zero-filled
//! - Non-canonical columns are dropped
//! - Non-numeric cells are coerced to zero

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::schema::{is_au_column, ChunkSource, FeatureSchema, RawTable};
use crate::types::{FeatureRow, FeatureTable};
use std::cmp::Ordering;

/// Column carrying the extractor's frame number
const FRAME_COLUMN: &str = "frame";

/// Reconciler for building canonical feature tables from chunk tables
#[derive(Debug, Clone)]
pub struct FeatureTableReconciler {
    schema: FeatureSchema,
    label: String,
    order_by_frame: bool,
}

impl Default for FeatureTableReconciler {
    fn default() -> Self {
        Self::new(FeatureSchema::reference())
    }
}

impl FeatureTableReconciler {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            label: crate::config::DEFAULT_LABEL.to_string(),
            order_by_frame: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            label: config.label.clone(),
            order_by_frame: config.order_by_frame,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_frame_ordering(mut self, enabled: bool) -> Self {
        self.order_by_frame = enabled;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Parse and reconcile raw chunk files.
    ///
    /// A file that fails to parse is logged and skipped. If every file is
    /// skipped the result is `EmptyInput`.
    pub fn reconcile_sources(&self, sources: &[ChunkSource]) -> Result<FeatureTable, PipelineError> {
        if sources.is_empty() {
            return Err(PipelineError::EmptyInput(
                "no chunk tables supplied".to_string(),
            ));
        }

        let mut tables = Vec::with_capacity(sources.len());
        for source in sources {
            match source.parse() {
                Ok(table) => tables.push(table),
                Err(e) => log::warn!("Skipping chunk table {}: {}", source.name, e),
            }
        }

        if tables.is_empty() {
            return Err(PipelineError::EmptyInput(format!(
                "all {} chunk tables failed to parse",
                sources.len()
            )));
        }

        self.reconcile(&tables)
    }

    /// Merge parsed chunk tables into one canonical table
    pub fn reconcile(&self, tables: &[RawTable]) -> Result<FeatureTable, PipelineError> {
        if tables.is_empty() {
            return Err(PipelineError::EmptyInput(
                "no chunk tables supplied".to_string(),
            ));
        }

        let order = concatenation_order(tables);
        log::debug!(
            "Reconciling {} chunk tables in order {:?}",
            tables.len(),
            order.iter().map(|&i| tables[i].source.as_str()).collect::<Vec<_>>()
        );

        let mut seen = vec![false; self.schema.len()];
        let mut rows = Vec::new();

        for (chunk_id, &table_idx) in order.iter().enumerate() {
            let table = &tables[table_idx];
            let mapping = self.column_mapping(&table.headers);
            for (slot, pos) in seen.iter_mut().zip(&mapping) {
                *slot |= pos.is_some();
            }

            let extra: Vec<&str> = table
                .headers
                .iter()
                .map(|h| h.trim())
                .filter(|h| is_au_column(h) && !self.schema.contains(h))
                .collect();
            if !extra.is_empty() {
                log::debug!("{}: ignoring AU columns {:?}", table.source, extra);
            }

            let mut coerced = 0usize;
            for cells in self.ordered_rows(table) {
                let values = mapping
                    .iter()
                    .map(|pos| match pos {
                        Some(col) => {
                            let (value, ok) = coerce_cell(cells.get(*col).map(String::as_str));
                            if !ok {
                                coerced += 1;
                            }
                            value
                        }
                        None => 0.0,
                    })
                    .collect();

                rows.push(FeatureRow {
                    values,
                    chunk_id: chunk_id as u32,
                });
            }

            if coerced > 0 {
                log::warn!(
                    "{}: {} non-numeric cells replaced with 0",
                    table.source,
                    coerced
                );
            }
        }

        let available = seen.iter().filter(|s| **s).count();
        log::info!(
            "Found {} of the required {} feature columns",
            available,
            self.schema.len()
        );
        for (name, _) in self.schema.names().iter().zip(&seen).filter(|(_, s)| !**s) {
            log::warn!("Added missing column {} with zeros", name);
        }

        FeatureTable::new(self.schema.clone(), rows, self.label.clone())
    }

    /// For each canonical feature, the index of the matching table column
    fn column_mapping(&self, headers: &[String]) -> Vec<Option<usize>> {
        self.schema
            .names()
            .iter()
            .map(|name| headers.iter().position(|h| h.trim() == name.as_str()))
            .collect()
    }

    fn ordered_rows<'a>(&self, table: &'a RawTable) -> Vec<&'a Vec<String>> {
        let mut rows: Vec<&Vec<String>> = table.rows.iter().collect();
        if !self.order_by_frame {
            return rows;
        }

        let Some(frame_col) = table.headers.iter().position(|h| h.trim() == FRAME_COLUMN) else {
            return rows;
        };

        let frame_of = |row: &Vec<String>| {
            row.get(frame_col)
                .and_then(|c| c.trim().parse::<f64>().ok())
                .filter(|f| f.is_finite())
        };
        rows.sort_by(|a, b| match (frame_of(*a), frame_of(*b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        rows
    }
}

/// Table positions sorted by chunk index; unindexed tables go last in their
/// input order
fn concatenation_order(tables: &[RawTable]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tables.len()).collect();
    order.sort_by_key(|&i| match tables[i].chunk_index {
        Some(idx) => (0u8, idx),
        None => (1u8, 0),
    });
    order
}

/// Parse a cell as a finite number; anything else becomes 0.
///
/// Returns the value and whether parsing succeeded. Empty and missing cells
/// count as successful zeros.
fn coerce_cell(cell: Option<&str>) -> (f32, bool) {
    let trimmed = match cell.map(str::trim) {
        None | Some("") => return (0.0, true),
        Some(c) => c,
    };

    match trimmed.parse::<f64>() {
        Ok(v) => {
            // Values beyond f32 range overflow to infinity in the cast
            let value = v as f32;
            if value.is_finite() {
                (value, true)
            } else {
                (0.0, true)
            }
        }
        Err(_) => (0.0, false),
    }
}
