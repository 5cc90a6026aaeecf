use std::collections::{BTreeSet, HashSet};

use crate::{IngestError, IngestResult};

/// Columns a calculator needs, plus which columns hold numbers.
///
/// `numeric` may name optional columns too; they are coerced when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSchema {
    columns: Vec<String>,
    numeric: BTreeSet<String>,
}

impl RequiredSchema {
    /// Fails on an empty list or a repeated name.
    pub fn new<I, S>(columns: I) -> IngestResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(IngestError::InvalidSchema(
                "at least one required column".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(IngestError::InvalidSchema(format!(
                    "duplicate column '{c}'"
                )));
            }
        }
        Ok(Self {
            columns,
            numeric: BTreeSet::new(),
        })
    }

    pub fn with_numeric<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn numeric(&self) -> &BTreeSet<String> {
        &self.numeric
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.contains(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    /// Absent required names, in required-schema order.
    Missing(Vec<String>),
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn missing(&self) -> &[String] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Missing(m) => m,
        }
    }

    pub fn into_result(self) -> IngestResult<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Missing(m) => Err(IngestError::MissingColumns(m)),
        }
    }
}

/// Checks a header against `required`. Header order does not matter and an
/// empty header reports every required column missing.
pub fn validate<I, S>(header_fields: I, required: &RequiredSchema) -> ValidationResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let present: HashSet<String> = header_fields
        .into_iter()
        .map(|h| h.as_ref().to_owned())
        .collect();
    let missing: Vec<String> = required
        .columns
        .iter()
        .filter(|c| !present.contains(c.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Missing(missing)
    }
}
