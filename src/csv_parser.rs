//! CSV ingestion with numeric type inference.
//!
//! Parses delimited text into a [`DataFrame`](crate::dataframe::DataFrame).
//! A column becomes [`Numeric`](crate::dataframe::DataType::Numeric) when
//! every non-null field parses as `f64`; otherwise it is kept as text and
//! cannot be selected for analysis.
//!
//! - RFC 4180 quoting (quoted delimiters, doubled quotes, embedded newlines)
//! - Null markers: empty, `NA`, `N/A`, `null`, `NULL`, `None`, `NaN`, `.` and friends
//! - UTF-8 BOM stripped, `\r\n` and bare `\r` line endings accepted
//!
//! # Example
//!
//! ```
//! use u_eda::csv_parser::CsvParser;
//! use u_eda::dataframe::DataType;
//!
//! let csv = "id,score,group\n1,2.5,a\n2,NA,b\n3,4.0,a\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column_by_name("score").unwrap().null_count(), 1);
//! assert_eq!(df.column_by_name("group").unwrap().data_type(), DataType::Text);
//! ```

use crate::dataframe::{Column, DataFrame, ValidityBitmap};
use crate::error::EdaError;
use std::path::Path;

/// Null markers recognized by default (compared after trimming).
const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", ".", "NaN", "nan", "NAN",
    "#N/A", "#NA",
];

/// CSV parser configuration and entry point.
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvParser {
    /// Comma delimiter, header row, default null markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Sets the field delimiter.
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets whether the first record is a header.
    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Replaces the null markers.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Parses a CSV string into a DataFrame.
    pub fn parse_str(&self, input: &str) -> Result<DataFrame, EdaError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let records = self.split_records(input);

        let mut records = records.into_iter();
        let Some(first) = records.next() else {
            return Ok(DataFrame::new());
        };

        let (headers, body): (Vec<String>, Vec<Vec<String>>) = if self.has_header {
            (first.into_iter().map(|h| h.trim().to_string()).collect(), records.collect())
        } else {
            let headers = (0..first.len()).map(|i| format!("col_{i}")).collect();
            (headers, std::iter::once(first).chain(records).collect())
        };

        if body.is_empty() {
            return Ok(DataFrame::new());
        }

        let width = headers.len();
        let header_offset = usize::from(self.has_header) + 1;
        let mut fields_by_column: Vec<Vec<&str>> = vec![Vec::with_capacity(body.len()); width];
        for (row_idx, record) in body.iter().enumerate() {
            if record.len() != width {
                return Err(EdaError::CsvParse {
                    line: row_idx + header_offset,
                    message: format!("expected {width} fields, got {}", record.len()),
                });
            }
            for (col_idx, field) in record.iter().enumerate() {
                fields_by_column[col_idx].push(field.trim());
            }
        }

        let mut df = DataFrame::new();
        for (name, fields) in headers.into_iter().zip(fields_by_column) {
            df.add_column(name, self.build_column(&fields))?;
        }
        tracing::debug!(
            rows = df.row_count(),
            columns = df.column_count(),
            "parsed CSV input"
        );
        Ok(df)
    }

    /// Reads and parses a CSV file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DataFrame, EdaError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content)
    }

    // ── Internal parsing ─────────────────────────────────────────

    /// Splits raw text into records of unquoted fields, skipping blank lines.
    fn split_records(&self, input: &str) -> Vec<Vec<String>> {
        let delim = self.delimiter as char;
        let mut records = Vec::new();
        let mut record: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = input.chars().peekable();

        let mut finish_record = |record: &mut Vec<String>, field: &mut String| {
            record.push(std::mem::take(field));
            let blank = record.len() == 1 && record[0].trim().is_empty();
            let done = std::mem::take(record);
            if !blank {
                records.push(done);
            }
        };

        while let Some(c) = chars.next() {
            match (quoted, c) {
                (true, '"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                (true, '"') => quoted = false,
                (true, _) => field.push(c),
                (false, '"') if field.trim().is_empty() => {
                    field.clear();
                    quoted = true;
                }
                (false, c) if c == delim => record.push(std::mem::take(&mut field)),
                (false, '\r') => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    finish_record(&mut record, &mut field);
                }
                (false, '\n') => finish_record(&mut record, &mut field),
                (false, _) => field.push(c),
            }
        }
        if !field.is_empty() || !record.is_empty() {
            finish_record(&mut record, &mut field);
        }
        records
    }

    fn is_null(&self, field: &str) -> bool {
        self.null_markers.iter().any(|m| m == field)
    }

    /// Builds a numeric column when every non-null field parses, else text.
    fn build_column(&self, fields: &[&str]) -> Column {
        let parsed: Vec<Option<Option<f64>>> = fields
            .iter()
            .map(|f| {
                if self.is_null(f) {
                    Some(None)
                } else {
                    f.parse::<f64>().ok().map(Some)
                }
            })
            .collect();

        if parsed.iter().all(Option::is_some) {
            let values: Vec<Option<f64>> = parsed.into_iter().flatten().collect();
            return Column::from_options(&values);
        }

        let validity = ValidityBitmap::from_flags(fields.iter().map(|f| !self.is_null(f)));
        let values = fields
            .iter()
            .map(|f| if self.is_null(f) { String::new() } else { (*f).to_string() })
            .collect();
        Column::text(values, validity)
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
