use crate::row::{Cell, RawRow, TypedRow};
use crate::schema::RequiredSchema;

/// Lossy, total numeric coercion: keep digits, `.` and `-`, then read the
/// longest leading literal. Anything unreadable or non-finite is `0`.
pub fn coerce_numeric(text: &str) -> f64 {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let literal = leading_literal(&kept);
    match literal.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

// `-?digits*(.digits*)?` with at least one digit, else "".
fn leading_literal(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        ""
    } else {
        &s[..end]
    }
}

/// Turns a raw row into a [`TypedRow`] using the schema's numeric columns.
/// A column name repeated in the header keeps its first value only.
pub fn normalize(row: &RawRow, schema: &RequiredSchema) -> TypedRow {
    let mut typed = TypedRow {
        required: vec![None; schema.columns().len()],
        ..Default::default()
    };
    for (name, value) in row.iter() {
        let cell = if schema.is_numeric(name) {
            Cell::Number(coerce_numeric(value))
        } else {
            Cell::Text(value.to_string())
        };
        match schema.position(name) {
            Some(idx) => {
                // first occurrence wins, same as RawRow::get
                if typed.required[idx].is_none() {
                    typed.required[idx] = Some(cell);
                }
            }
            None => {
                typed.extra.entry(name.to_string()).or_insert(cell);
            }
        }
    }
    typed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn strips_currency_and_separators() {
        assert_eq!(coerce_numeric("$12.50"), 12.5);
        assert_eq!(coerce_numeric("1,299.99"), 1299.99);
        assert_eq!(coerce_numeric("-3.5%"), -3.5);
        assert_eq!(coerce_numeric("4.7 stars"), 4.7);
    }

    #[test]
    fn unreadable_text_is_zero() {
        assert_eq!(coerce_numeric("abc"), 0.0);
        assert_eq!(coerce_numeric(""), 0.0);
        assert_eq!(coerce_numeric("-"), 0.0);
        assert_eq!(coerce_numeric("."), 0.0);
        assert_eq!(coerce_numeric(&"9".repeat(400)), 0.0);
    }

    #[test]
    fn malformed_literal_keeps_leading_number() {
        assert_eq!(coerce_numeric("1.2.3"), 1.2);
        assert_eq!(coerce_numeric("12-5"), 12.0);
    }

    #[test]
    fn repeated_column_keeps_first_value() {
        let schema = RequiredSchema::new(["asin", "price"])
            .unwrap()
            .with_numeric(["price"]);
        let header: Arc<[String]> = ["asin", "price", "price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let raw = RawRow::new(header, vec!["B01".into(), "3".into(), "9".into()]);
        assert_eq!(raw.get("price"), Some("3"));
        assert_eq!(normalize(&raw, &schema).number(&schema, "price"), Some(3.0));
    }

    #[test]
    fn text_and_numeric_columns() {
        let schema = RequiredSchema::new(["asin", "price"])
            .unwrap()
            .with_numeric(["price", "bsr"]);
        let header: Arc<[String]> = ["price", "asin", "bsr", "note"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let raw = RawRow::new(
            header,
            vec!["$12.50".into(), "B000123456".into(), "#1,204".into(), "x".into()],
        );
        let typed = normalize(&raw, &schema);
        assert_eq!(typed.number(&schema, "price"), Some(12.5));
        assert_eq!(typed.text(&schema, "asin"), Some("B000123456"));
        assert_eq!(typed.number(&schema, "bsr"), Some(1204.0));
        assert_eq!(typed.text(&schema, "note"), Some("x"));
    }
}
