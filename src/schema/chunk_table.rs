//! Raw per-chunk tables produced by the upstream AU extractor
//!
//! A chunk table is kept as untyped string cells; typing and schema
//! enforcement happen in the reconciler.

use crate::error::PipelineError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Name fragment preceding the chunk number in extractor output files
const CHUNK_MARKER: &str = "chunk_";

/// One per-chunk table as emitted by the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Where the table came from (usually a file name)
    pub source: String,
    /// Concatenation order key; `None` sorts after every indexed table
    pub chunk_index: Option<u64>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from in-memory cells. The chunk index is derived from
    /// `source`.
    pub fn from_rows(source: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let source = source.into();
        let chunk_index = chunk_index_from_name(&source);
        Self {
            source,
            chunk_index,
            headers,
            rows,
        }
    }

    /// Override the derived chunk index
    pub fn with_chunk_index(mut self, chunk_index: Option<u64>) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    /// Parse a CSV table with a header row. Whitespace around headers and
    /// cells is ignored. Rows may be shorter or longer than the header; the
    /// reconciler zero-fills absent cells.
    pub fn from_csv_reader<R: Read>(source: impl Into<String>, reader: R) -> Result<Self, PipelineError> {
        let source = source.into();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(PipelineError::ParseError(format!(
                "{}: missing header row",
                source
            )));
        }

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| {
                PipelineError::ParseError(format!("{}: row {}: {}", source, idx + 1, e))
            })?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        log::debug!(
            "Parsed chunk table {}: {} columns, {} rows",
            source,
            headers.len(),
            rows.len()
        );

        Ok(Self::from_rows(source, headers, rows))
    }

    /// Read and parse a CSV file, naming the table after the file
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        Self::from_csv_reader(path.display().to_string(), file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An already-materialized chunk file handed to the pipeline
#[derive(Debug, Clone)]
pub struct ChunkSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ChunkSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn parse(&self) -> Result<RawTable, PipelineError> {
        RawTable::from_csv_reader(self.name.clone(), self.bytes.as_slice())
    }
}

/// Extract the chunk number from names like `video.mp4_chunk_12.csv`.
///
/// Only the final path component is inspected. Returns `None` when the name
/// has no `chunk_<n>` marker or the number does not parse.
pub fn chunk_index_from_name(name: &str) -> Option<u64> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);

    let (_, after) = file_name.split_once(CHUNK_MARKER)?;
    let digits = after.split('.').next()?;
    digits.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_index_from_name() {
        assert_eq!(chunk_index_from_name("clip.mp4_chunk_0.csv"), Some(0));
        assert_eq!(chunk_index_from_name("AU_output/clip.mp4_chunk_12.csv"), Some(12));
        assert_eq!(chunk_index_from_name("chunk_3"), Some(3));
        assert_eq!(chunk_index_from_name("chunk_x.csv"), None);
        assert_eq!(chunk_index_from_name("summary.csv"), None);
        assert_eq!(chunk_index_from_name("chunk_dir/summary.csv"), None);
    }

    #[test]
    fn test_parse_csv_trims_headers_and_cells() {
        let csv = "frame, AU01_r,  AU02_c\n1, 0.5, 1\n2,0.25 ,0\n";
        let table = RawTable::from_csv_reader("v_chunk_4.csv", csv.as_bytes()).unwrap();

        assert_eq!(table.chunk_index, Some(4));
        assert_eq!(table.headers, vec!["frame", "AU01_r", "AU02_c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["2", "0.25", "0"]);
    }

    #[test]
    fn test_parse_csv_keeps_ragged_rows() {
        let csv = "AU01_r,AU02_r\n1,2\n3\n4,5,6\n";
        let table = RawTable::from_csv_reader("ragged.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[1], vec!["3"]);
    }

    #[test]
    fn test_parse_csv_invalid_utf8_fails() {
        let bytes: &[u8] = b"AU01_r\n\xff\xfe\n";
        let result = RawTable::from_csv_reader("bad.csv", bytes);
        assert!(matches!(result, Err(PipelineError::ParseError(_))));
    }

    #[test]
    fn test_parse_empty_input_fails() {
        let result = RawTable::from_csv_reader("empty.csv", "".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_source_parse() {
        let source = ChunkSource::new("a_chunk_1.csv", "AU01_r\n0.1\n");
        let table = source.parse().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.chunk_index, Some(1));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_chunk_7.csv");
        std::fs::write(&path, "AU04_r\n1.5\n2.5\n").unwrap();

        let table = RawTable::from_path(&path).unwrap();
        assert_eq!(table.chunk_index, Some(7));
        assert_eq!(table.len(), 2);
    }
}
