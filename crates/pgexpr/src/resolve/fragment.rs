//! Resolved SQL fragments.

use crate::value::ParamValue;
use tokio_postgres::types::ToSql;

/// SQL text plus the parameters its placeholders refer to, in order.
///
/// Placeholders are numbered from the cursor the fragment was resolved at, so
/// a fragment is only meaningful next to the parameters that precede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<ParamValue>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<ParamValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment without parameters.
    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// A single placeholder bound to `value`.
    pub fn placeholder(cursor: usize, value: ParamValue) -> Self {
        Self {
            sql: format!("${cursor}"),
            params: vec![value],
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[ParamValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<ParamValue>) {
        (self.sql, self.params)
    }

    /// Move the parameters onto the end of a statement's list and return the
    /// SQL text. The fragment must have been resolved at `params.len() + 1`.
    pub fn append_to(self, params: &mut Vec<ParamValue>) -> String {
        params.extend(self.params);
        self.sql
    }

    /// Get all parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    /// Renumber a fragment whose placeholders start at `$1` so they start at
    /// `cursor` instead.
    pub fn renumbered(&self, cursor: usize) -> Fragment {
        let offset = cursor.saturating_sub(1);
        if offset == 0 || self.params.is_empty() {
            return self.clone();
        }
        Fragment {
            sql: shift_placeholders(&self.sql, offset),
            params: self.params.clone(),
        }
    }
}

/// Add `offset` to every `$n` placeholder outside of string literals, quoted
/// identifiers, dollar-quoted bodies and comments.
///
/// For example, with offset=3: `$1 AND $2` becomes `$4 AND $5`
pub(crate) fn shift_placeholders(sql: &str, offset: usize) -> String {
    let bytes = sql.as_bytes();
    let mut result = String::with_capacity(sql.len() + 4);
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'\'' => {
                let escapes = i > 0
                    && matches!(bytes[i - 1], b'E' | b'e')
                    && (i < 2 || !is_ident_byte(bytes[i - 2]));
                i = skip_string(bytes, i + 1, escapes);
            }
            b'"' => i = skip_past(bytes, i + 1, b"\""),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_past(bytes, i + 2, b"\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i + 2),
            b'$' if i == 0 || !is_ident_byte(bytes[i - 1]) => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits > 0 {
                    let end = i + 1 + digits;
                    match sql[i + 1..end].parse::<usize>() {
                        Ok(old_idx) => {
                            result.push('$');
                            result.push_str(&(old_idx + offset).to_string());
                        }
                        Err(_) => result.push_str(&sql[i..end]),
                    }
                    i = end;
                    continue;
                }
                i = match dollar_tag(bytes, i) {
                    Some(tag_end) => skip_past(bytes, tag_end, &bytes[i..tag_end]),
                    None => i + 1,
                };
            }
            _ => {
                // Advance over a whole character; every delimiter above is ASCII.
                i += sql[i..].chars().next().map_or(1, char::len_utf8);
            }
        }
        result.push_str(&sql[start..i]);
    }

    result
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Position just past `needle`, searching from `from`; the end of input when
/// it never occurs.
fn skip_past(bytes: &[u8], from: usize, needle: &[u8]) -> usize {
    bytes[from.min(bytes.len())..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map_or(bytes.len(), |p| from + p + needle.len())
}

/// Skip the rest of a `'...'` literal. `''` is an embedded quote; with
/// `escapes` (an `E'...'` literal) so is `\'`.
fn skip_string(bytes: &[u8], mut i: usize, escapes: bool) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Block comments nest.
fn skip_block_comment(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 1;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// End of a `$$` or `$tag$` opener starting at `start`, if there is one.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if let Some(&first) = bytes.get(i) {
        if first.is_ascii_alphabetic() || first == b'_' || first >= 0x80 {
            i += 1;
            while bytes
                .get(i)
                .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80)
            {
                i += 1;
            }
        }
    }
    (bytes.get(i) == Some(&b'$')).then_some(i + 1)
}
