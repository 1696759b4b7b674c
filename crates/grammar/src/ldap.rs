//! LDAP filter string helpers (RFC 4515).

use model::core::value::Value;

/// Matches every entry; every directory entry carries an object class.
pub const TRUE_FILTER: &str = "(objectClass=*)";
pub const FALSE_FILTER: &str = "(!(objectClass=*))";

pub fn constant(value: bool) -> &'static str {
    if value { TRUE_FILTER } else { FALSE_FILTER }
}

/// Escapes an assertion value: `*`, `(`, `)`, `\` and NUL become `\XX`.
pub fn escape_value(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '*' => escaped.push_str(r"\2a"),
            '(' => escaped.push_str(r"\28"),
            ')' => escaped.push_str(r"\29"),
            '\\' => escaped.push_str(r"\5c"),
            '\0' => escaped.push_str(r"\00"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverses [`escape_value`]. Fails on a truncated or non-hex escape.
pub fn unescape_value(raw: &str) -> Result<String, String> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut input = raw.bytes();
    while let Some(byte) = input.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let hex = [input.next(), input.next()];
        let [Some(hi), Some(lo)] = hex else {
            return Err(format!("truncated escape in '{raw}'"));
        };
        let pair = [hi, lo];
        let digits = std::str::from_utf8(&pair).map_err(|e| e.to_string())?;
        let decoded = u8::from_str_radix(digits, 16)
            .map_err(|_| format!("invalid escape '\\{digits}' in '{raw}'"))?;
        bytes.push(decoded);
    }
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Text form of a value inside an assertion, before escaping.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Boolean(true) => "TRUE".to_string(),
        Value::Boolean(false) => "FALSE".to_string(),
        other => other.to_text(),
    }
}

/// Converts a LIKE pattern into a substring assertion value: `%` becomes `*`,
/// everything else is escaped. `None` when the pattern uses `_`, which has no
/// directory counterpart.
pub fn like_to_substring(pattern: &str) -> Option<String> {
    if pattern.contains('_') {
        return None;
    }
    let parts = pattern
        .split('%')
        .map(escape_value)
        .collect::<Vec<_>>();
    Some(parts.join("*"))
}
