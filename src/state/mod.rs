//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `PaginationState`: Where the extractor is within one manufacturer's pages
//! - `StopReason`: Why pagination for a manufacturer ended

mod page_state;

// Re-export main types
pub use page_state::{PaginationState, StopReason};
