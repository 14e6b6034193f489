//! Identifier quoting and naming helpers.
//!
//! Entity and field names end up as table and column names, so every place
//! that renders them into SQL goes through one of these functions.

/// Quote an identifier using ANSI double-quoting.
///
/// Embedded double-quotes are doubled (`"` → `""`).
///
/// ```
/// use sqlentity_core::quote_ident;
///
/// assert_eq!(quote_ident("pet"), "\"pet\"");
/// assert_eq!(quote_ident("pet\"s"), "\"pet\"\"s\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier using MySQL backticks.
///
/// ```
/// use sqlentity_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("pet"), "`pet`");
/// assert_eq!(quote_ident_mysql("pe`t"), "`pe``t`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Strip everything but ASCII alphanumerics and underscores.
///
/// Used when deriving column names (foreign keys) from entity names.
#[inline]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Conventional foreign-key column for a relation owned by `owner`.
///
/// `default_foreign_key("Person", "id")` is `"person_id"`.
pub fn default_foreign_key(owner: &str, identifier: &str) -> String {
    format!(
        "{}_{}",
        sanitize_identifier(owner).to_ascii_lowercase(),
        sanitize_identifier(identifier)
    )
}
