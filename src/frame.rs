//! The in-memory rectangular dataset abstraction the rest of the crate is
//! built on: column access by name, row subsetting by index set, and a
//! column-level missing-value predicate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VartreatError};

/// A single column's data, either numeric or categorical.
///
/// Missing numeric values are `None`; `Some(x)` where `x` is NaN or
/// infinite is also treated as missing by [`Column::is_missing`], matching
/// the Frame invariant that no encoder ever sees a non-finite value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.data, ColumnData::Categorical(_))
    }

    /// True if row `r` is missing: absent, NaN, or infinite for numeric
    /// columns; absent for categorical ones.
    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => match v.get(row) {
                Some(Some(x)) => !x.is_finite(),
                _ => true,
            },
            ColumnData::Categorical(v) => !matches!(v.get(row), Some(Some(_))),
        }
    }

    pub fn numeric_value(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().filter(|x| x.is_finite()),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn categorical_value(&self, row: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Categorical(v) => v.get(row).and_then(|o| o.as_deref()),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Count of missing cells in the column.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&r| self.is_missing(r)).count()
    }

    /// All non-missing numeric values, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|r| self.numeric_value(r)).collect()
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        match &self.data {
            ColumnData::Numeric(v) => Column::numeric(
                self.name.clone(),
                rows.iter().map(|&r| v.get(r).copied().flatten()).collect(),
            ),
            ColumnData::Categorical(v) => Column::categorical(
                self.name.clone(),
                rows.iter().map(|&r| v.get(r).cloned().flatten()).collect(),
            ),
        }
    }
}

/// An ordered collection of named, equal-length columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Frame {
    /// Build a frame from columns. All columns must share the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first_len) = columns.first().map(Column::len) {
            for col in &columns {
                if col.len() != first_len {
                    return Err(VartreatError::SchemaMismatch(format!(
                        "column '{}' has length {} but frame row count is {}",
                        col.name,
                        col.len(),
                        first_len
                    )));
                }
            }
        }
        let mut frame = Self {
            columns,
            index: HashMap::new(),
        };
        frame.rebuild_index();
        Ok(frame)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| VartreatError::ColumnNotFound(name.to_string()))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn push_column(&mut self, column: Column) {
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
    }

    /// Return a new frame containing only the rows in `rows`, in the order
    /// given. Rows may repeat or be omitted.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let columns = self.columns.iter().map(|c| c.select_rows(rows)).collect();
        let mut frame = Self {
            columns,
            index: HashMap::new(),
        };
        frame.rebuild_index();
        frame
    }

    /// A cheap fingerprint of row count plus a content hash, used to detect
    /// when `transform` is called on the same frame that was used to `fit`.
    pub fn content_fingerprint(&self) -> (usize, u64) {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.row_count().hash(&mut hasher);
        for col in &self.columns {
            col.name.hash(&mut hasher);
            match &col.data {
                ColumnData::Numeric(v) => {
                    for value in v {
                        value.map(|x| x.to_bits()).hash(&mut hasher);
                    }
                }
                ColumnData::Categorical(v) => {
                    for value in v {
                        value.hash(&mut hasher);
                    }
                }
            }
        }
        (self.row_count(), hasher.finish())
    }
}
