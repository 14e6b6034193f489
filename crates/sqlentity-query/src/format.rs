//! Statement templates with `?` and `??` placeholders.
//!
//! `??` takes an identifier (quoted for the dialect) and `?` takes a value
//! (rendered as an escaped literal). Placeholders inside single-quoted
//! string literals are left alone.

use sqlentity_core::{Dialect, Error, QueryErrorKind, Result, Value};

/// A placeholder found in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `??`
    Identifier,
    /// `?`
    Value,
}

/// List the placeholders of `template` in order.
pub fn placeholders(template: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    scan(template, |piece| {
        if let Piece::Placeholder(p) = piece {
            found.push(p);
        }
    });
    found
}

/// Expand `template` with `params`.
///
/// Fails with a syntax error when the number of parameters does not match
/// the number of placeholders, or when a `??` parameter is not text.
pub fn format_query(template: &str, params: &[Value], dialect: Dialect) -> Result<String> {
    let mut out = String::with_capacity(template.len() + params.len() * 8);
    let mut params_iter = params.iter();
    let mut error = None;

    scan(template, |piece| {
        if error.is_some() {
            return;
        }
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Placeholder(kind) => {
                let Some(param) = params_iter.next() else {
                    error = Some(syntax(template, "not enough parameters for template"));
                    return;
                };
                match kind {
                    Placeholder::Identifier => match param.as_str() {
                        Some(name) => out.push_str(&dialect.quote_identifier(name)),
                        None => {
                            error = Some(syntax(
                                template,
                                format!(
                                    "identifier placeholder expects text, got {}",
                                    param.type_name()
                                ),
                            ));
                        }
                    },
                    Placeholder::Value => out.push_str(&escape_literal(param)),
                }
            }
        }
    });

    if let Some(err) = error {
        return Err(err);
    }
    if params_iter.next().is_some() {
        return Err(syntax(template, "too many parameters for template"));
    }
    Ok(out)
}

/// Render a value as a SQL literal.
pub fn escape_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::BigInt(v) | Value::Timestamp(v) => v.to_string(),
        Value::Date(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Text(s) => quote_text(s),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
        Value::Json(json) => quote_text(&json.to_string()),
    }
}

/// Collapse runs of whitespace and trim, for comparing templates.
pub fn normalize(template: &str) -> String {
    template.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn syntax(template: &str, message: impl Into<String>) -> Error {
    match Error::query(QueryErrorKind::Syntax, message) {
        Error::Query(mut q) => {
            q.sql = Some(template.to_string());
            Error::Query(q)
        }
        other => other,
    }
}

enum Piece<'t> {
    Text(&'t str),
    Placeholder(Placeholder),
}

fn scan<'t>(template: &'t str, mut emit: impl FnMut(Piece<'t>)) {
    let bytes = template.as_bytes();
    let mut in_string = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_string = !in_string;
                i += 1;
            }
            b'?' if !in_string => {
                if start < i {
                    emit(Piece::Text(&template[start..i]));
                }
                if bytes.get(i + 1) == Some(&b'?') {
                    emit(Piece::Placeholder(Placeholder::Identifier));
                    i += 2;
                } else {
                    emit(Piece::Placeholder(Placeholder::Value));
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        emit(Piece::Text(&template[start..]));
    }
}
