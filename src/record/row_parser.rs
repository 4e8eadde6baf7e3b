//! Row parsing
//!
//! Converts one listing row into a `PartRecord`. Every field is looked up
//! independently, so a broken cell costs that field and nothing else.

use crate::config::SiteConfig;
use crate::record::schema::Field;
use crate::record::value::{FieldValue, PartRecord};
use crate::session::Element;
use url::Url;

/// Conversion applied to a cell's trimmed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Keep the text
    Text,
    /// Digits with at most one decimal point
    Decimal,
    /// Digits only
    Integer,
    /// A decimal after removing thousands separators and the currency symbol
    Price,
}

impl Transform {
    /// Applies the transform; None means "fall back to the raw text"
    pub fn apply(&self, text: &str) -> Option<FieldValue> {
        match self {
            Self::Text => Some(FieldValue::Text(text.to_string())),
            Self::Decimal => parse_decimal(text),
            Self::Integer => {
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                    text.parse().ok().map(FieldValue::Integer)
                } else {
                    None
                }
            }
            Self::Price => parse_decimal(&text.replace([',', '$'], "")),
        }
    }
}

fn parse_decimal(text: &str) -> Option<FieldValue> {
    let digits = text.replacen('.', "", 1);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().map(FieldValue::Number)
}

/// Where a field lives in a row and how it is converted
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub field: Field,
    /// 1-based cell position within the row
    pub position: usize,
    pub transform: Transform,
}

const fn descriptor(field: Field, position: usize, transform: Transform) -> FieldDescriptor {
    FieldDescriptor {
        field,
        position,
        transform,
    }
}

/// Cell position of the name, which is parsed separately for its hyperlink
pub const NAME_POSITION: usize = 3;

/// Every cell except the name, in row order
pub const DESCRIPTORS: [FieldDescriptor; 7] = [
    descriptor(Field::Manufacturer, 1, Transform::Text),
    descriptor(Field::Article, 2, Transform::Text),
    descriptor(Field::Weight, 4, Transform::Decimal),
    descriptor(Field::Availability, 5, Transform::Integer),
    descriptor(Field::LeadTime, 6, Transform::Integer),
    descriptor(Field::Information, 7, Transform::Text),
    descriptor(Field::Price, 8, Transform::Price),
];

/// Parses listing rows into part records
#[derive(Debug, Clone)]
pub struct RowParser {
    cell_template: String,
    not_applicable_class: String,
    base_url: Option<Url>,
}

impl RowParser {
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            cell_template: site.selectors.row_cell.clone(),
            not_applicable_class: site.selectors.not_applicable_class.clone(),
            base_url: Url::parse(&site.base_url).ok(),
        }
    }

    fn cell_selector(&self, position: usize) -> String {
        self.cell_template.replace("{index}", &position.to_string())
    }

    fn cell(&self, row: &Element, position: usize) -> Option<Element> {
        let selector = self.cell_selector(position);
        match row.find(&selector) {
            Ok(cell) => {
                if cell.is_none() {
                    tracing::debug!("No cell for '{}'", selector);
                }
                cell
            }
            Err(e) => {
                tracing::debug!("Failed to look up '{}': {}", selector, e);
                None
            }
        }
    }

    fn is_not_applicable(&self, cell: &Element) -> bool {
        match cell.find("i") {
            Ok(Some(icon)) => icon.class_contains(&self.not_applicable_class),
            _ => false,
        }
    }

    /// Reads one field; None when the cell is missing
    pub fn read_field(&self, row: &Element, descriptor: &FieldDescriptor) -> Option<FieldValue> {
        let cell = self.cell(row, descriptor.position)?;
        if self.is_not_applicable(&cell) {
            return Some(FieldValue::NotApplicable);
        }

        let text = cell.text();
        let value = descriptor.transform.apply(&text);
        Some(value.unwrap_or(FieldValue::Text(text)))
    }

    fn read_name(&self, row: &Element, record: &mut PartRecord) {
        let Some(cell) = self.cell(row, NAME_POSITION) else {
            return;
        };

        match cell.find("a") {
            Ok(Some(link)) => {
                record.set(Field::Name, FieldValue::Text(link.text()));
                if let Some(href) = link.attr("href") {
                    let resolved = self
                        .base_url
                        .as_ref()
                        .and_then(|base| crate::url::resolve_link(&href, base))
                        .unwrap_or(href);
                    record.set(Field::NameUrl, FieldValue::Text(resolved));
                }
            }
            _ => record.set(Field::Name, FieldValue::Text(cell.text())),
        }
    }

    /// Parses a row element into a record for `category` and `keyword`
    ///
    /// Never fails: fields that cannot be read are left absent.
    pub fn parse(&self, row: &Element, category: &str, keyword: &str) -> PartRecord {
        let mut record = PartRecord::new(keyword, category);

        for descriptor in DESCRIPTORS.iter() {
            if let Some(value) = self.read_field(row, descriptor) {
                record.set(descriptor.field, value);
            }
        }
        self.read_name(row, &mut record);

        record
    }
}
