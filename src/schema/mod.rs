//! Input schema for per-chunk action unit tables
//!
//! This module defines the canonical feature schema every reconciled table
//! exposes, and the raw chunk tables produced by the upstream AU extractor.

mod chunk_table;
mod features;

pub use chunk_table::*;
pub use features::*;
