//! Instance validation against declared field constraints.
//!
//! Runs before any statement is issued, so a failing instance never reaches
//! the driver.

use crate::error::{ValidationError, ValidationErrorKind};
use crate::field::FieldInfo;
use crate::instance::Instance;
use crate::types::FieldKind;
use crate::value::Value;

/// Validate every declared field of `instance`.
///
/// Collects all failures instead of stopping at the first one.
pub fn validate_instance(instance: &Instance) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    for field in instance.schema().fields() {
        check_field(field, instance.get(&field.name), &mut errors);
    }
    errors.into_result()
}

fn check_field(field: &FieldInfo, value: Option<&Value>, errors: &mut ValidationError) {
    let value = match value {
        None | Some(Value::Null) => {
            // Generated keys are filled in by the driver; any other key
            // must come from the caller.
            if (field.required || field.key) && !field.is_generated() {
                errors.add_required(field.name.clone());
            }
            return;
        }
        Some(v) => v,
    };

    if !field.kind.accepts(value) {
        match &field.kind {
            FieldKind::Enum(allowed) => errors.add(
                field.name.clone(),
                ValidationErrorKind::Enum,
                format!("must be one of: {}", allowed.join(", ")),
            ),
            kind => errors.add_type(field.name.clone(), kind.name(), value.type_name()),
        }
        return;
    }

    if let (Some(regex), Value::Text(text)) = (&field.pattern, value) {
        if !regex.is_match(text) {
            errors.add_pattern(field.name.clone(), regex.as_str());
        }
    }
}
