//! Foundation types for the cppdoc pipeline.
//!
//! This module provides the fundamental types used throughout the engine:
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineIndex`], [`LineCol`] - Line/column conversion
//!
//! This module has NO dependencies on other cppdoc modules.

mod line_index;

pub use line_index::{LineCol, LineIndex};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
