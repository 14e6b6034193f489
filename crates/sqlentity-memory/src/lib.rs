//! In-memory driver for sqlentity.
//!
//! `MemoryConnection` implements [`sqlentity_core::Connection`] over tables
//! held in process memory. It renders every statement it runs with the
//! query builders and keeps them in a log, which makes it the driver of
//! choice for tests of the persistence pipeline.

pub mod connection;
mod table;

pub use connection::{LoggedStatement, MemoryConnection};
