//! Default value resolution.
//!
//! Defaults only ever apply to inserts. An update writes an absent field as
//! `NULL`; the declared default is never substituted back in. Column
//! defaults owned by the database are not modeled here, the driver applies
//! them to columns the insert leaves out.

use crate::field::FieldInfo;
use crate::value::Value;

/// The statement a value is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// New row
    Insert,
    /// Existing row
    Update,
}

/// Resolve the value of a field the caller did not supply.
///
/// `None` means the field stays absent.
pub fn resolve(field: &FieldInfo, operation: Operation) -> Option<Value> {
    match operation {
        Operation::Insert => field.default.as_ref().map(|d| d.produce()),
        Operation::Update => None,
    }
}
