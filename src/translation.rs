use crate::error::EngineError;
use crate::query::NamedParams;
use crate::types::{PlaceholderStyle, SqlValue};

/// Outcome of translating `:name` placeholders into positional ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedSql {
    /// SQL text with every named placeholder replaced.
    pub text: String,
    /// Stripped parameter names, one entry per occurrence, in order of
    /// appearance. Binding happens positionally against this list.
    pub names: Vec<String>,
}

/// Rewrite `:name` placeholders into the backend's positional syntax.
///
/// A named placeholder is a colon followed by an identifier, outside quoted
/// strings and comments, not adjacent to a quote character, and not part of
/// a `::` cast. A name that appears more than once is recorded at every
/// occurrence and bound at every position.
#[must_use]
pub fn translate_named(sql: &str, style: PlaceholderStyle) -> TranslatedSql {
    let bytes = sql.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => {
                    state = State::SingleQuoted;
                    out.push(b'\'');
                }
                b'"' => {
                    state = State::DoubleQuoted;
                    out.push(b'"');
                }
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    out.extend_from_slice(b"--");
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment;
                    out.extend_from_slice(b"/*");
                    idx += 1;
                }
                b':' if bytes.get(idx + 1) == Some(&b':') => {
                    // postgres cast, copy verbatim
                    out.extend_from_slice(b"::");
                    idx += 1;
                }
                b':' => {
                    let quote_adjacent = idx > 0 && matches!(bytes[idx - 1], b'\'' | b'"');
                    match scan_identifier(bytes, idx + 1) {
                        Some((end, name)) if !quote_adjacent => {
                            names.push(name.to_string());
                            match style {
                                PlaceholderStyle::Postgres => {
                                    out.push(b'$');
                                    out.extend_from_slice(names.len().to_string().as_bytes());
                                }
                                PlaceholderStyle::Sqlite => out.push(b'?'),
                            }
                            idx = end - 1;
                        }
                        _ => out.push(b':'),
                    }
                }
                _ => out.push(b),
            },
            State::SingleQuoted => {
                out.push(b);
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        out.push(b'\'');
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                out.push(b);
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        out.push(b'"');
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                out.push(b);
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                out.push(b);
                if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    out.push(b'/');
                    idx += 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    // input is valid UTF-8 and only ASCII is spliced at ASCII boundaries
    let text = String::from_utf8(out).expect("translation preserves UTF-8");
    TranslatedSql { text, names }
}

/// Resolve recorded occurrence names against supplied bindings.
///
/// Names supplied but never used by the SQL text are ignored.
///
/// # Errors
/// Returns `EngineError::ParameterError` when a recorded name has no
/// binding.
pub fn bind_named(names: &[String], params: &NamedParams) -> Result<Vec<SqlValue>, EngineError> {
    let mut bound = Vec::with_capacity(names.len());
    for name in names {
        match params.get(name) {
            Some(value) => bound.push(value.clone()),
            None => {
                return Err(EngineError::ParameterError(format!(
                    "named parameter :{name} has no binding"
                )));
            }
        }
    }
    Ok(bound)
}

enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

fn scan_identifier(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .map(|name| (idx, name))
}
