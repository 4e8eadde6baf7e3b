//! Part records and their extraction from listing rows
//!
//! # Components
//!
//! - `schema`: The ordered output columns shared by parser and writer
//! - `PartRecord` / `FieldValue`: One extracted listing and its cell values
//! - `RowParser`: Declarative per-field extraction with transform fallbacks

pub mod schema;

mod row_parser;
mod value;

pub use row_parser::{FieldDescriptor, RowParser, Transform, DESCRIPTORS, NAME_POSITION};
pub use schema::{Column, ColumnKind, Field, COLUMNS};
pub use value::{FieldValue, PartRecord, NOT_APPLICABLE};
