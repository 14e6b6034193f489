//! Error types for sqlentity operations.

use std::fmt;

/// The primary error type for all sqlentity operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors reported by a driver
    Connection(ConnectionError),
    /// Statement execution errors reported by a driver
    Query(QueryError),
    /// Type conversion errors (row decoding)
    Type(TypeError),
    /// Malformed entity or association declaration
    Schema(SchemaError),
    /// Configuration errors
    Config(ConfigError),
    /// A field failed a declared constraint before persistence was attempted
    Validation(ValidationError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The connection was closed or lost
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed or unsupported statement
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table, column or row not found
    NotFound,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub entity: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Field name collides with a reserved instance accessor
    ReservedName,
    /// Field declared twice on the same entity
    DuplicateField,
    /// Association name already used on the owning entity
    DuplicateRelation,
    /// Entity name registered twice
    DuplicateEntity,
    /// Entity referenced but never defined
    UnknownEntity,
    /// Unknown field type name
    UnknownType,
    /// Default literal does not fit the field kind
    InvalidDefault,
    /// Field pattern failed to compile
    InvalidPattern,
    /// Any other malformed declaration
    Invalid,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Validation error for field-level and instance-level validation.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The errors grouped by field name (or "__model__" for instance-level)
    pub errors: Vec<FieldValidationError>,
}

/// A single validation error for a field.
#[derive(Debug, Clone)]
pub struct FieldValidationError {
    /// The field name that failed validation
    pub field: String,
    /// The kind of validation that failed
    pub kind: ValidationErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// The type of validation constraint that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field is missing/null
    Required,
    /// Value does not match the declared field kind
    Type,
    /// Value is not one of the declared enum values
    Enum,
    /// Value doesn't match regex pattern
    Pattern,
    /// Key not declared on a strict entity
    Unknown,
    /// Association payload is malformed or nested too deeply
    Association,
    /// Instance-level validation failed
    Model,
}

impl ValidationError {
    /// Create a new empty validation error container.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Create a container holding a single error.
    pub fn single(
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new();
        err.add(field, kind, message);
        err
    }

    /// Check if there are any validation errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add a field validation error.
    pub fn add(
        &mut self,
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldValidationError {
            field: field.into(),
            kind,
            message: message.into(),
        });
    }

    /// Add a required field error.
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(
            field,
            ValidationErrorKind::Required,
            "is required".to_string(),
        );
    }

    /// Add a kind mismatch error.
    pub fn add_type(&mut self, field: impl Into<String>, expected: &str, actual: &str) {
        self.add(
            field,
            ValidationErrorKind::Type,
            format!("expected {expected}, got {actual}"),
        );
    }

    /// Add a pattern match error.
    pub fn add_pattern(&mut self, field: impl Into<String>, pattern: &str) {
        self.add(
            field,
            ValidationErrorKind::Pattern,
            format!("must match pattern '{pattern}'"),
        );
    }

    /// Add a model-level validation error.
    ///
    /// The error is recorded with field "__model__".
    pub fn add_model_error(&mut self, message: impl Into<String>) {
        self.add("__model__", ValidationErrorKind::Model, message);
    }

    /// Check whether any recorded error has the given kind.
    pub fn has_kind(&self, kind: ValidationErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Convert to Result, returning Ok(()) if no errors, Err(self) otherwise.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new()
    }
}

impl Error {
    /// Shorthand for a schema error on `entity`.
    pub fn schema(
        kind: SchemaErrorKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Schema(SchemaError {
            kind,
            entity: entity.into(),
            message: message.into(),
        })
    }

    /// Shorthand for a query error without SQL context.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: None,
            sqlstate: None,
            message: message.into(),
            source: None,
        })
    }

    /// Is this an error raised by the driver (connection or statement)?
    pub fn is_driver_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Query(_))
    }

    /// Is this a validation error?
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Get SQLSTATE if available (e.g., "23505" for unique violation)
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl QueryError {
    /// Is this a unique constraint violation?
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate.as_deref() == Some("23505")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Schema(e) => write!(f, "Schema error on '{}': {}", e.entity, e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "validation passed")
        } else if self.errors.len() == 1 {
            let err = &self.errors[0];
            write!(f, "validation error on '{}': {}", err.field, err.message)
        } else {
            writeln!(f, "validation errors:")?;
            for err in &self.errors {
                writeln!(f, "  - {}: {}", err.field, err.message)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

/// Result type alias for sqlentity operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_helpers() {
        let query = QueryError {
            kind: QueryErrorKind::Constraint,
            sql: Some("INSERT INTO pet".to_string()),
            sqlstate: Some("23505".to_string()),
            message: "duplicate key".to_string(),
            source: None,
        };
        assert!(query.is_unique_violation());

        let err = Error::Query(query);
        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(err.sql(), Some("INSERT INTO pet"));
        assert!(err.is_driver_error());
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_display_single_and_many() {
        let single = ValidationError::single("name", ValidationErrorKind::Required, "is required");
        assert_eq!(single.to_string(), "validation error on 'name': is required");
        assert!(single.has_kind(ValidationErrorKind::Required));

        let mut many = ValidationError::new();
        many.add_required("name");
        many.add_type("age", "number", "TEXT");
        let text = many.to_string();
        assert!(text.contains("  - name: is required"));
        assert!(text.contains("  - age: expected number, got TEXT"));
        assert!(many.into_result().is_err());
    }

    #[test]
    fn schema_error_display_names_entity() {
        let err = Error::schema(SchemaErrorKind::DuplicateField, "pet", "field 'name' redeclared");
        assert_eq!(err.to_string(), "Schema error on 'pet': field 'name' redeclared");
    }
}
