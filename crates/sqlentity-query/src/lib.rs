//! SQL rendering for sqlentity.
//!
//! - [`InsertBuilder`], [`UpdateBuilder`] and [`SelectBuilder`] turn driver
//!   statements into `(sql, params)` for a dialect
//! - [`format_query`] expands `?`/`??` templates into literal SQL

pub mod builder;
pub mod format;

pub use builder::{InsertBuilder, SelectBuilder, UpdateBuilder};
pub use format::{Placeholder, escape_literal, format_query, normalize, placeholders};
pub use sqlentity_core::Dialect;
