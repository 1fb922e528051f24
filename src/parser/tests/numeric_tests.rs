//! Tests for legacy numeric normalisation

use crate::models::RawValue;
use crate::parser::numeric::{normalize_legacy, parse_field, parse_number};

#[test]
fn test_missing_leading_zero() {
    assert_eq!(normalize_legacy("-.1000"), "-0.1000");
    assert_eq!(normalize_legacy(" .5 "), "0.5");
    assert_eq!(normalize_legacy("+.25"), "0.25");
    assert_eq!(parse_number("-.1000"), Some(-0.1));
}

#[test]
fn test_missing_exponent_letter() {
    assert_eq!(normalize_legacy("1.234-05"), "1.234E-05");
    assert_eq!(normalize_legacy("-2.5+03"), "-2.5E+03");
    assert_eq!(parse_number("1.5-03"), Some(1.5e-3));
    assert_eq!(parse_number("-.5-2"), Some(-0.005));
}

#[test]
fn test_double_precision_exponent() {
    assert_eq!(normalize_legacy("1.0D+03"), "1.0E+03");
    assert_eq!(parse_number("2.5d-1"), Some(0.25));
}

#[test]
fn test_plain_numbers_untouched() {
    assert_eq!(normalize_legacy("12.75"), "12.75");
    assert_eq!(normalize_legacy("-4"), "-4");
    assert_eq!(normalize_legacy("1.5E-03"), "1.5E-03");
    assert_eq!(parse_number("-4"), Some(-4.0));
    assert_eq!(parse_number("3."), Some(3.0));
}

#[test]
fn test_non_finite_and_garbage_rejected() {
    assert_eq!(parse_number("********"), None);
    assert_eq!(parse_number("NaN"), None);
    assert_eq!(parse_number("inf"), None);
    assert_eq!(parse_number("1.2.3"), None);
    assert_eq!(parse_number(""), None);
}

#[test]
fn test_parse_field_blank_is_missing() {
    assert_eq!(parse_field("        "), Ok(RawValue::Missing));
    assert_eq!(parse_field("  7.5"), Ok(RawValue::Number(7.5)));
    assert_eq!(parse_field(" abc "), Err("abc".to_string()));
}

#[test]
fn test_bare_decimal_point_is_not_zero() {
    assert_eq!(normalize_legacy("."), ".");
    assert_eq!(normalize_legacy("-."), "-.");
    assert_eq!(parse_number("+."), None);
    assert_eq!(parse_field("."), Err(".".to_string()));
    assert_eq!(parse_field(" -. "), Err("-.".to_string()));
    assert_eq!(parse_field("+."), Err("+.".to_string()));
}
