//! Best-effort coercion of loosely typed JSON into numbers.
//!
//! Every function here is pure and answers `None` instead of failing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Read a number from a JSON value that may be a number or formatted text
/// such as `"$ 12.500"` or `"1500,75"`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number_text(s),
        _ => None,
    }
}

/// Keep only digits, `.`, `,` and `-`, turn the first `,` into a decimal
/// point and parse. Empty or malformed leftovers give `None`.
pub fn parse_number_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = cleaned.replacen(',', ".", 1);
    normalized.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Read a price-like value. Numbers keep their exact decimal rendering.
pub fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Parse a model year. Non-numeric, fractional and zero values are `None`.
pub fn parse_year(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    let year = match trimmed.parse::<i32>() {
        Ok(y) => y,
        Err(_) => {
            let f = trimmed.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 || f.abs() > f64::from(i32::MAX) {
                return None;
            }
            f as i32
        }
    };
    (year != 0).then_some(year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_number_accepts_numbers_and_text() {
        assert_eq!(as_number(&json!(12000)), Some(12000.0));
        assert_eq!(as_number(&json!(15.5)), Some(15.5));
        assert_eq!(as_number(&json!("2018")), Some(2018.0));
        assert_eq!(as_number(&json!("$ 12000")), Some(12000.0));
        assert_eq!(as_number(&json!("1500,75")), Some(1500.75));
    }

    #[test]
    fn test_as_number_fails_soft() {
        assert_eq!(as_number(&json!(null)), None);
        assert_eq!(as_number(&json!(true)), None);
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!("")), None);
        // thousands separators with dots are ambiguous
        assert_eq!(as_number(&json!("1.500.000")), None);
        assert_eq!(as_number(&json!({"amount": 3})), None);
    }

    #[test]
    fn test_as_decimal_preserves_value() {
        assert_eq!(as_decimal(&json!(10000)), Some(Decimal::from(10000)));
        assert_eq!(
            as_decimal(&json!(12000.5)),
            Some(Decimal::from_str("12000.5").unwrap())
        );
        assert_eq!(as_decimal(&json!("9999.99")), Decimal::from_str("9999.99").ok());
        assert_eq!(as_decimal(&json!("n/a")), None);
        assert_eq!(as_decimal(&json!(null)), None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year(" 2015 "), Some(2015));
        assert_eq!(parse_year("2019.0"), Some(2019));
        assert_eq!(parse_year("2019.5"), None);
        assert_eq!(parse_year("dos mil"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("0"), None);
    }
}
