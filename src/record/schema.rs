//! Output column schema
//!
//! One ordered table drives both the row parser (which fields exist) and the
//! table writer (header text, column order, rendering).

use std::fmt;

/// A field of a part record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Keyword,
    Category,
    Manufacturer,
    Article,
    Name,
    NameUrl,
    Weight,
    Availability,
    LeadTime,
    Information,
    Price,
}

/// How a column's values are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    /// Numbers rendered with two decimals
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: Field,
    pub header: &'static str,
    pub index: usize,
    pub kind: ColumnKind,
}

const fn column(field: Field, header: &'static str, index: usize, kind: ColumnKind) -> Column {
    Column {
        field,
        header,
        index,
        kind,
    }
}

/// Every output column, in artifact order
pub const COLUMNS: [Column; 11] = [
    column(Field::Keyword, "Keyword", 0, ColumnKind::Plain),
    column(Field::Category, "Category", 1, ColumnKind::Plain),
    column(Field::Manufacturer, "Manufacturer", 2, ColumnKind::Plain),
    column(Field::Article, "Article", 3, ColumnKind::Plain),
    column(Field::Name, "Name", 4, ColumnKind::Plain),
    column(Field::Weight, "Net Weight, kg", 5, ColumnKind::Plain),
    column(Field::Availability, "Availability", 6, ColumnKind::Plain),
    column(Field::LeadTime, "Lead Time, days", 7, ColumnKind::Plain),
    column(Field::Information, "Information", 8, ColumnKind::Plain),
    column(Field::Price, "Price ($)", 9, ColumnKind::Currency),
    column(Field::NameUrl, "Name URL", 10, ColumnKind::Plain),
];

/// Header row, each header placed at its column's index
pub fn headers() -> Vec<&'static str> {
    let mut headers = vec![""; COLUMNS.len()];
    for column in &COLUMNS {
        if let Some(slot) = headers.get_mut(column.index) {
            *slot = column.header;
        }
    }
    headers
}

impl Field {
    /// The column this field is written to
    pub fn column(&self) -> &'static Column {
        // every field has exactly one column; checked by the schema tests
        COLUMNS
            .iter()
            .find(|column| column.field == *self)
            .unwrap_or(&COLUMNS[0])
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column().header)
    }
}
