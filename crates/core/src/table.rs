// Column-oriented in-memory table.
// Stages never mutate a table they received; they consume it and return a new one.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// Spellings that load as a missing cell, in addition to the empty string.
pub const NULL_SPELLINGS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single nullable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    /// Always finite.
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text written to CSV output. Missing renders as the empty string.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Value::Missing => Cow::Borrowed(""),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Form used for exact key comparison. `None` is the missing key.
    ///
    /// Loaded number cells render back to their source text, so comparing
    /// renderings is comparing the raw values: a numeric `75001` on one side
    /// equals a textual `75001` on the other, and `75001.0` equals neither.
    pub fn key_repr(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Missing => None,
            other => Some(other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Shortest round-tripping rendering; integral values drop the fraction.
pub fn format_number(v: f64) -> String {
    format!("{v}")
}

/// True if the raw cell loads as missing.
pub fn is_null_spelling(raw: &str) -> bool {
    raw.is_empty() || NULL_SPELLINGS.contains(&raw)
}

/// Parse a raw cell as a number only when its rendering gives back the exact text.
///
/// `01000`, `1.50`, `75001.0`, `+5`, ` 45` and `1e3` stay text, so a loaded
/// number cell always renders as its source text.
pub fn parse_plain_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && format_number(*v) == raw)
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Type assigned to a column once, at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Every cell is missing.
    Empty,
    /// Every non-missing cell is a plain number.
    Number,
    /// Anything else, mixed columns included.
    Text,
}

impl ColumnType {
    /// Classify raw cells. Missing spellings are ignored.
    pub fn classify<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut kind = ColumnType::Empty;
        for raw in cells {
            if is_null_spelling(raw) {
                continue;
            }
            if parse_plain_number(raw).is_none() {
                return ColumnType::Text;
            }
            kind = ColumnType::Number;
        }
        kind
    }

    /// Infer the type of already-typed values.
    pub fn infer(values: &[Value]) -> Self {
        let mut kind = ColumnType::Empty;
        for v in values {
            match v {
                Value::Missing => {}
                Value::Number(_) => kind = ColumnType::Number,
                Value::Text(_) => return ColumnType::Text,
            }
        }
        kind
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    /// Build a column from typed values, inferring its type.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = ColumnType::infer(&values);
        Self { name: name.into(), kind, values }
    }

    /// Build a column from raw CSV cells, classifying it first.
    pub fn from_raw<S: AsRef<str>>(name: impl Into<String>, cells: &[S]) -> Self {
        let kind = ColumnType::classify(cells.iter().map(|c| c.as_ref()));
        let values = cells
            .iter()
            .map(|c| {
                let raw = c.as_ref();
                if is_null_spelling(raw) {
                    return Value::Missing;
                }
                match kind {
                    // classify() guarantees every non-null cell parses
                    ColumnType::Number => parse_plain_number(raw).map(Value::Number).unwrap_or(Value::Missing),
                    _ => Value::Text(raw.to_string()),
                }
            })
            .collect();
        Self { name: name.into(), kind, values }
    }

    pub fn missing(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            kind: ColumnType::Empty,
            values: vec![Value::Missing; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn non_missing(&self) -> usize {
        self.values.iter().filter(|v| !v.is_missing()).count()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Header-only table.
    pub fn with_headers<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let columns = headers.into_iter().map(|h| Column::missing(h, 0)).collect();
        Self { columns, rows: 0 }
    }

    /// Build from columns of equal length.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == rows), "ragged columns");
        Self { columns, rows }
    }

    /// Build from raw row-major CSV cells, classifying every column once.
    ///
    /// Short rows are padded with missing cells; extra trailing cells are dropped.
    pub fn from_raw_rows(headers: Vec<String>, rows: &[Vec<String>]) -> Self {
        let width = headers.len();
        let mut cells: Vec<Vec<&str>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            for (col, slot) in cells.iter_mut().enumerate() {
                slot.push(row.get(col).map(|s| s.as_str()).unwrap_or(""));
            }
        }
        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column::from_raw(name, &raw))
            .collect();
        Self { columns, rows: rows.len() }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace the column of the same name in place, or append it.
    pub fn with_column(mut self, column: Column) -> Self {
        debug_assert!(self.columns.is_empty() || column.len() == self.rows, "column length mismatch");
        if self.columns.is_empty() {
            self.rows = column.len();
        }
        match self.position(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        self
    }

    /// Rendered rows, for writers.
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<Cow<'_, str>>> + '_ {
        (0..self.rows).map(move |r| self.columns.iter().map(|c| c.values[r].render()).collect())
    }
}
