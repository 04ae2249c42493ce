//! Column-major DataFrame for tabular data.
//!
//! The [`DataFrame`] stores named columns alongside a compact validity
//! bitmap that tracks missing values. The analysis pipeline only reasons
//! about numeric columns; text columns are kept so that a CSV with label
//! columns can be loaded unchanged and the numeric selection made later.
//!
//! Row-level operations ([`DataFrame::take_rows`], [`Column::fill_nulls`])
//! always return new values: the source frame is never mutated by the
//! cleaning stage.
//!
//! # Example
//!
//! ```
//! use u_eda::dataframe::{Column, DataFrame};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "temperature".to_string(),
//!     Column::from_options(&[Some(20.5), None, Some(19.8)]),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.total_null_count(), 1);
//! ```

use crate::error::EdaError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap, one bit per row (1 = valid, 0 = null).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        Self::from_flags(std::iter::repeat(true).take(len))
    }

    /// Creates a bitmap where all `len` positions are null.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap to be filled with [`push`](Self::push).
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Builds a bitmap from per-row validity flags.
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let mut bitmap = Self::empty();
        for valid in flags {
            bitmap.push(valid);
        }
        bitmap
    }

    /// Returns `true` if position `idx` holds a value.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        idx < self.len && (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Marks position `idx` as valid.
    pub fn set_valid(&mut self, idx: usize) {
        if idx < self.len {
            self.bits[idx / 64] |= 1u64 << (idx % 64);
        }
    }

    /// Marks position `idx` as null.
    pub fn set_invalid(&mut self, idx: usize) {
        if idx < self.len {
            self.bits[idx / 64] &= !(1u64 << (idx % 64));
        }
    }

    /// Appends one position.
    pub fn push(&mut self, valid: bool) {
        if self.len % 64 == 0 {
            self.bits.push(0);
        }
        self.len += 1;
        if valid {
            self.set_valid(self.len - 1);
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap has no positions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of null positions.
    pub fn null_count(&self) -> usize {
        self.len - self.valid_count()
    }

    /// Number of valid positions.
    pub fn valid_count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the indices of valid positions in ascending order.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }

    /// Gathers the flags at `indices` into a new bitmap.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self::from_flags(indices.iter().map(|&i| self.is_valid(i)))
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Semantic data type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Continuous or integer numeric values (stored as `f64`).
    Numeric,
    /// Anything that did not parse as a number.
    Text,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with a validity bitmap.
///
/// Null positions hold a placeholder (`0.0` or an empty string) that must
/// be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Free-form text.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    /// Creates a text column.
    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Creates a numeric column from optional values (`None` = null).
    ///
    /// Non-finite values (NaN) are treated as null.
    pub fn from_options(values: &[Option<f64>]) -> Self {
        let validity =
            ValidityBitmap::from_flags(values.iter().map(|v| v.is_some_and(f64::is_finite)));
        let values = values
            .iter()
            .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
            .collect();
        Self::Numeric { values, validity }
    }

    /// Returns the data type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Text { .. } => DataType::Text,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. } | Self::Text { validity, .. } => validity,
        }
    }

    /// Returns the number of null values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns the number of valid values.
    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    /// Returns `true` if the value at `idx` is not null.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the raw numeric storage, or `None` for text columns.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric { values, .. } => Some(values),
            Self::Text { .. } => None,
        }
    }

    /// Returns the numeric value at `idx`, or `None` if null or not numeric.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns the text value at `idx`, or `None` if null or not text.
    pub fn text_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Text { values, validity } if validity.is_valid(idx) => Some(&values[idx]),
            _ => None,
        }
    }

    /// Returns the valid numeric values (nulls dropped) in row order.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            Self::Text { .. } => None,
        }
    }

    /// Gathers the rows at `indices` into a new column.
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            Self::Numeric { values, validity } => Self::Numeric {
                values: indices.iter().map(|&i| values[i]).collect(),
                validity: validity.take(indices),
            },
            Self::Text { values, validity } => Self::Text {
                values: indices.iter().map(|&i| values[i].clone()).collect(),
                validity: validity.take(indices),
            },
        }
    }

    /// Returns a copy with every null replaced by `fill`.
    ///
    /// Text columns are returned unchanged.
    pub fn fill_nulls(&self, fill: f64) -> Self {
        match self {
            Self::Numeric { values, validity } => {
                let filled = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| if validity.is_valid(i) { v } else { fill })
                    .collect();
                Self::Numeric {
                    values: filled,
                    validity: ValidityBitmap::all_valid(values.len()),
                }
            }
            Self::Text { .. } => self.clone(),
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// All columns have the same number of rows.
#[derive(Debug, Clone)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Builds a numeric DataFrame from `(name, values)` pairs.
    ///
    /// ```
    /// use u_eda::dataframe::DataFrame;
    ///
    /// let df = DataFrame::from_numeric(vec![
    ///     ("x", vec![Some(1.0), Some(2.0)]),
    ///     ("y", vec![None, Some(4.0)]),
    /// ]).unwrap();
    /// assert_eq!(df.column_names(), &["x", "y"]);
    /// ```
    pub fn from_numeric<S: Into<String>>(
        columns: Vec<(S, Vec<Option<f64>>)>,
    ) -> Result<Self, EdaError> {
        let mut df = Self::new();
        for (name, values) in columns {
            df.add_column(name.into(), Column::from_options(&values))?;
        }
        Ok(df)
    }

    /// Adds a named column.
    ///
    /// Returns an error if the column length doesn't match the existing
    /// row count (unless this is the first column).
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), EdaError> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(EdaError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Replaces the column called `name`, keeping its position.
    pub fn replace_column(&mut self, name: &str, column: Column) -> Result<(), EdaError> {
        let idx = self.column_index(name).ok_or_else(|| EdaError::ColumnNotFound {
            name: name.to_string(),
        })?;
        if column.len() != self.row_count {
            return Err(EdaError::DimensionMismatch {
                expected: self.row_count,
                actual: column.len(),
            });
        }
        self.columns[idx] = column;
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Returns the index of the column with the given `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Returns a summary of column data types.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(name, col)| (name, col.data_type())).collect()
    }

    /// Returns the total number of null values across all columns.
    pub fn total_null_count(&self) -> usize {
        self.columns.iter().map(|c| c.null_count()).sum()
    }

    /// Looks up a column that must exist and be numeric.
    pub fn numeric_column(&self, name: &str) -> Result<&Column, EdaError> {
        let col = self
            .column_by_name(name)
            .ok_or_else(|| EdaError::ColumnNotFound {
                name: name.to_string(),
            })?;
        match col.data_type() {
            DataType::Numeric => Ok(col),
            DataType::Text => Err(EdaError::NonNumericColumn {
                column: name.to_string(),
            }),
        }
    }

    /// Copies the named numeric columns, in the given order, into a new frame.
    pub fn select(&self, names: &[String]) -> Result<DataFrame, EdaError> {
        let mut out = DataFrame::new();
        for name in names {
            let col = self.numeric_column(name)?.clone();
            out.add_column(name.clone(), col)?;
        }
        if out.is_empty() {
            out.row_count = self.row_count;
        }
        Ok(out)
    }

    /// Gathers the rows at `indices` (in that order) into a new frame.
    pub fn take_rows(&self, indices: &[usize]) -> DataFrame {
        DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }

    /// Returns the values of the named columns, which must be free of nulls.
    ///
    /// Used by stages that, like a least-squares fit, cannot tolerate
    /// missing data.
    pub fn complete_columns(&self, names: &[String]) -> Result<Vec<Vec<f64>>, EdaError> {
        names
            .iter()
            .map(|name| {
                let col = self.numeric_column(name)?;
                let nulls = col.null_count();
                if nulls > 0 {
                    return Err(EdaError::MissingValues {
                        column: name.clone(),
                        count: nulls,
                    });
                }
                Ok(col.as_numeric().map(<[f64]>::to_vec).unwrap_or_default())
            })
            .collect()
    }

    /// Returns the named columns restricted to rows where every one of them
    /// is valid (listwise deletion).
    pub fn complete_cases(&self, names: &[String]) -> Result<Vec<Vec<f64>>, EdaError> {
        let cols = names
            .iter()
            .map(|name| self.numeric_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&i| cols.iter().all(|c| c.is_valid(i)))
            .collect();
        Ok(cols
            .iter()
            .map(|c| rows.iter().filter_map(|&i| c.numeric_at(i)).collect())
            .collect())
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── ValidityBitmap ───────────────────────────────────────────

    #[test]
    fn bitmap_all_valid_crosses_word_boundary() {
        let bm = ValidityBitmap::all_valid(130);
        assert_eq!(bm.len(), 130);
        assert_eq!(bm.valid_count(), 130);
        assert_eq!(bm.null_count(), 0);
        assert!(bm.is_valid(129));
        assert!(!bm.is_valid(130));
    }

    #[test]
    fn bitmap_set_and_count() {
        let mut bm = ValidityBitmap::all_valid(10);
        bm.set_invalid(3);
        bm.set_invalid(7);
        assert_eq!(bm.null_count(), 2);
        assert_eq!(bm.valid_indices().collect::<Vec<_>>(), vec![0, 1, 2, 4, 5, 6, 8, 9]);
        bm.set_valid(3);
        assert_eq!(bm.null_count(), 1);
    }

    #[test]
    fn bitmap_all_invalid() {
        let bm = ValidityBitmap::all_invalid(5);
        assert_eq!(bm.null_count(), 5);
        assert_eq!(bm.valid_indices().count(), 0);
    }

    #[test]
    fn bitmap_take() {
        let bm = ValidityBitmap::from_flags([true, false, true, false]);
        let taken = bm.take(&[3, 2, 0]);
        assert_eq!(taken.len(), 3);
        assert!(!taken.is_valid(0));
        assert!(taken.is_valid(1));
        assert!(taken.is_valid(2));
    }

    // ── Column ───────────────────────────────────────────────────

    #[test]
    fn column_from_options_treats_nan_as_null() {
        let col = Column::from_options(&[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(col.null_count(), 2);
        assert_eq!(col.valid_numeric_values().unwrap(), vec![1.0, 4.0]);
        assert_eq!(col.numeric_at(1), None);
        assert_eq!(col.numeric_at(3), Some(4.0));
    }

    #[test]
    fn column_fill_nulls() {
        let col = Column::from_options(&[Some(1.0), None, Some(3.0)]);
        let filled = col.fill_nulls(2.0);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.as_numeric().unwrap(), &[1.0, 2.0, 3.0]);
        // source untouched
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn column_take_preserves_validity() {
        let col = Column::from_options(&[Some(1.0), None, Some(3.0)]);
        let taken = col.take(&[1, 2]);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken.numeric_at(0), None);
        assert_eq!(taken.numeric_at(1), Some(3.0));
    }

    #[test]
    fn text_column_accessors() {
        let col = Column::text(
            vec!["a".into(), String::new()],
            ValidityBitmap::from_flags([true, false]),
        );
        assert_eq!(col.data_type(), DataType::Text);
        assert_eq!(col.text_at(0), Some("a"));
        assert_eq!(col.text_at(1), None);
        assert!(col.as_numeric().is_none());
        assert_eq!(col.fill_nulls(1.0), col);
    }

    // ── DataFrame ────────────────────────────────────────────────

    fn sample() -> DataFrame {
        let mut df = DataFrame::from_numeric(vec![
            ("x", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
            ("y", vec![Some(10.0), None, Some(30.0), Some(40.0)]),
        ])
        .unwrap();
        df.add_column(
            "label".into(),
            Column::text(
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                ValidityBitmap::all_valid(4),
            ),
        )
        .unwrap();
        df
    }

    #[test]
    fn add_column_length_mismatch() {
        let mut df = sample();
        let err = df
            .add_column("z".into(), Column::from_options(&[Some(1.0)]))
            .unwrap_err();
        assert!(matches!(err, EdaError::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[test]
    fn select_orders_and_validates() {
        let df = sample();
        let sel = df.select(&["y".into(), "x".into()]).unwrap();
        assert_eq!(sel.column_names(), &["y", "x"]);
        assert_eq!(sel.row_count(), 4);

        let err = df.select(&["missing".into()]).unwrap_err();
        assert!(matches!(err, EdaError::ColumnNotFound { .. }));
        let err = df.select(&["label".into()]).unwrap_err();
        assert!(matches!(err, EdaError::NonNumericColumn { .. }));
    }

    #[test]
    fn take_rows_filters_every_column() {
        let df = sample();
        let sub = df.take_rows(&[0, 3]);
        assert_eq!(sub.row_count(), 2);
        assert_eq!(sub.column_by_name("x").unwrap().numeric_at(1), Some(4.0));
        assert_eq!(sub.column_by_name("label").unwrap().text_at(1), Some("d"));
    }

    #[test]
    fn complete_columns_rejects_nulls() {
        let df = sample();
        let err = df.complete_columns(&["x".into()]).unwrap_err();
        assert_eq!(
            err,
            EdaError::MissingValues {
                column: "x".into(),
                count: 1
            }
        );
    }

    #[test]
    fn complete_cases_listwise() {
        let df = sample();
        let cols = df.complete_cases(&["x".into(), "y".into()]).unwrap();
        assert_eq!(cols[0], vec![1.0, 4.0]);
        assert_eq!(cols[1], vec![10.0, 40.0]);
    }

    #[test]
    fn replace_column_keeps_position() {
        let mut df = sample();
        let filled = df.column_by_name("x").unwrap().fill_nulls(0.5);
        df.replace_column("x", filled).unwrap();
        assert_eq!(df.column_index("x"), Some(0));
        assert_eq!(df.column_by_name("x").unwrap().null_count(), 0);
    }
}
