use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schema::RequiredSchema;

/// One tokenized data line. The header is shared by every row of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    header: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    pub fn new(header: Arc<[String]>, values: Vec<String>) -> Self {
        Self { header, values }
    }

    /// Value of the first column called `name`, if this row reaches it.
    /// When the header repeats a name, later columns of that name are only
    /// reachable through [`RawRow::iter`].
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// Column names this row carries a value for.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    /// `(column, value)` pairs; values past the header width are dropped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len().min(self.header.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Always finite.
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Normalized row: one slot per required column, in schema order, plus the
/// file's other columns in `extra`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedRow {
    pub(crate) required: Vec<Option<Cell>>,
    pub(crate) extra: BTreeMap<String, Cell>,
}

impl TypedRow {
    /// Looks `name` up among the required slots first, then `extra`.
    pub fn get(&self, schema: &RequiredSchema, name: &str) -> Option<&Cell> {
        match schema.position(name) {
            Some(idx) => self.required.get(idx).and_then(Option::as_ref),
            None => self.extra.get(name),
        }
    }

    pub fn number(&self, schema: &RequiredSchema, name: &str) -> Option<f64> {
        self.get(schema, name).and_then(Cell::as_number)
    }

    pub fn text(&self, schema: &RequiredSchema, name: &str) -> Option<&str> {
        self.get(schema, name).and_then(Cell::as_text)
    }

    pub fn required(&self) -> &[Option<Cell>] {
        &self.required
    }

    pub fn extra(&self) -> &BTreeMap<String, Cell> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rows_only_expose_covered_keys() {
        let row = RawRow::new(header(&["asin", "price", "rating"]), vec!["B01".into(), "9".into()]);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["asin", "price"]);
        assert_eq!(row.get("rating"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn long_rows_drop_unnamed_values() {
        let row = RawRow::new(header(&["asin"]), vec!["B01".into(), "stray".into()]);
        assert_eq!(row.iter().count(), 1);
    }
}
