use crate::table::Value;

/// Light cleanup for clinical free text.
/// Normalises whitespace and keeps every clinical token as written.
///
/// - non-breaking spaces become ordinary spaces
/// - any whitespace run collapses to one space
/// - leading / trailing whitespace is trimmed
///
/// Total and idempotent.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(is_space).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// [`clean_text`] for a table cell
/// Missing cells (null / NaN) become the empty string, other types are
/// coerced to text first.
pub fn clean_value(value: &Value) -> String {
    match value {
        Value::Text(s) => clean_text(s),
        other => other.to_text().map(|s| clean_text(&s)).unwrap_or_default(),
    }
}

#[inline]
fn is_space(c: char) -> bool {
    // U+00A0 is already White_Space; U+001C..U+001F are separators treated as whitespace too
    c.is_whitespace() || c == '\u{00A0}' || ('\u{1c}'..='\u{1f}').contains(&c)
}
