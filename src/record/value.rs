use crate::record::schema::{ColumnKind, Field};
use std::collections::BTreeMap;
use std::fmt;

/// Written in place of a value the catalog marks as not applicable
pub const NOT_APPLICABLE: &str = "✔";

/// One extracted cell value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
    NotApplicable,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Renders the value for a column of the given kind
    pub fn render(&self, kind: ColumnKind) -> String {
        match (kind, self.as_f64()) {
            (ColumnKind::Currency, Some(amount)) => format!("{:.2}", amount),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Number(n) => write!(f, "{}", n),
            Self::NotApplicable => write!(f, "{}", NOT_APPLICABLE),
        }
    }
}

/// One part listing extracted from a manufacturer page
///
/// Keyword and category are always present; every other field is absent
/// when it could not be extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRecord {
    keyword: String,
    category: String,
    fields: BTreeMap<Field, FieldValue>,
}

impl PartRecord {
    pub fn new(keyword: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: category.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Sets an extracted field; keyword and category are fixed at construction
    pub fn set(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Keyword | Field::Category => {
                tracing::debug!("Ignoring attempt to overwrite {:?}", field)
            }
            _ => {
                self.fields.insert(field, value);
            }
        }
    }

    /// Value of any field, keyword and category included
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Keyword => Some(FieldValue::Text(self.keyword.clone())),
            Field::Category => Some(FieldValue::Text(self.category.clone())),
            _ => self.fields.get(&field).cloned(),
        }
    }

    pub fn name(&self) -> Option<&FieldValue> {
        self.fields.get(&Field::Name)
    }

    pub fn name_url(&self) -> Option<&str> {
        self.fields.get(&Field::NameUrl).and_then(FieldValue::as_text)
    }

    pub fn price(&self) -> Option<&FieldValue> {
        self.fields.get(&Field::Price)
    }
}
