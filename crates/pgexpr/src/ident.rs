//! SQL identifier quoting.
//!
//! Every identifier this crate emits (schemas, tables, columns, sequences,
//! constraints) is double-quoted, with embedded `"` escaped as `""`.

use crate::error::{Error, Result};

/// Check that a name can be quoted: non-empty and free of NUL characters.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::schema(format!("{kind} name cannot be empty")));
    }
    if name.contains('\0') {
        return Err(Error::schema(format!(
            "{kind} name cannot contain NUL character: {name:?}"
        )));
    }
    Ok(())
}

/// Quote a single identifier: `users` -> `"users"`.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_quoted(&mut out, name);
    out
}

/// Quote a schema-qualified name: `"public"."users"`.
pub fn qualified(schema: &str, name: &str) -> String {
    let mut out = String::with_capacity(schema.len() + name.len() + 5);
    write_quoted(&mut out, schema);
    out.push('.');
    write_quoted(&mut out, name);
    out
}

pub(crate) fn write_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}
