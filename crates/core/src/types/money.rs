//! Money parsing and formatting.
//!
//! Prices are persisted as exact decimals in the store currency. Back-office
//! forms accept whatever a human types (`42.000`, `42,000.00`, `$ 42.000,50`),
//! so [`parse_amount`] normalizes the common locale variants before parsing.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits used for display-currency amounts.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Parse a human-entered amount into an exact decimal.
///
/// Rules, applied in order:
/// - both `.` and `,` present with the comma last: `.` groups thousands and
///   `,` is the decimal mark (`42.000,50` -> `42000.50`)
/// - a single `.` followed by exactly three digits groups thousands
///   (`42.000` -> `42000`)
/// - a single `,` followed by exactly three digits groups thousands
///   (`42,000` -> `42000`); any other single `,` is a decimal mark
///   (`42000,5` -> `42000.5`)
/// - everything except digits, `.` and `-` is then dropped
///
/// Input that still does not parse falls back to its digits alone, and input
/// without digits yields zero.
#[must_use]
pub fn parse_amount(input: &str) -> Decimal {
    let mut s = input.trim().to_owned();

    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            s = s.replace('.', "").replace(',', ".");
        }
        _ => {
            if dots == 1 && commas == 0 && digits_after(&s, '.') == Some(3) {
                s = s.replace('.', "");
            }
            if commas == 1 && dots == 0 {
                s = if digits_after(&s, ',') == Some(3) {
                    s.replace(',', "")
                } else {
                    s.replace(',', ".")
                };
            }
        }
    }

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if matches!(cleaned.as_str(), "" | "." | "-") {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned).unwrap_or_else(|_| {
        let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
        Decimal::from_str(&digits).unwrap_or(Decimal::ZERO)
    })
}

/// Number of characters after the single occurrence of `sep`.
fn digits_after(s: &str, sep: char) -> Option<usize> {
    s.split_once(sep).map(|(_, after)| after.chars().count())
}

/// Round a display-currency amount to cents, half away from zero.
#[must_use]
pub fn round_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a store-currency amount for the back-office: whole units with `.`
/// grouping thousands (`42000` -> `42.000`).
#[must_use]
pub fn format_store_amount(amount: Decimal) -> String {
    let whole = amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i128()
        .unwrap_or_default();

    let sign = if whole < 0 { "-" } else { "" };
    format!("{sign}{}", group_thousands(&whole.unsigned_abs().to_string(), '.'))
}

/// Format a display-currency amount, e.g. `$1,234.56 USD`.
#[must_use]
pub fn format_display_amount(amount: Decimal, currency_code: &str) -> String {
    let mut rounded = round_display(amount);
    rounded.rescale(DISPLAY_DECIMALS);

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!(
        "{sign}${}.{frac_part} {currency_code}",
        group_thousands(int_part, ',')
    )
}

/// Insert `sep` between every group of three digits, counting from the right.
fn group_thousands(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn test_parse_plain_integer() {
        assert_eq!(parse_amount("42000"), dec("42000"));
    }

    #[test]
    fn test_parse_dot_thousands() {
        assert_eq!(parse_amount("42.000"), dec("42000"));
    }

    #[test]
    fn test_parse_dot_decimal() {
        assert_eq!(parse_amount("42000.50"), dec("42000.50"));
    }

    #[test]
    fn test_parse_european_format() {
        assert_eq!(parse_amount("42.000,00"), dec("42000.00"));
        assert_eq!(parse_amount("1.234.567,89"), dec("1234567.89"));
    }

    #[test]
    fn test_parse_comma_thousands() {
        assert_eq!(parse_amount("42,000"), dec("42000"));
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(parse_amount("42000,5"), dec("42000.5"));
    }

    #[test]
    fn test_parse_us_format_with_both_separators() {
        assert_eq!(parse_amount("42,000.00"), dec("42000.00"));
    }

    #[test]
    fn test_parse_strips_symbols_and_spaces() {
        assert_eq!(parse_amount(" $ 42.000 "), dec("42000"));
        assert_eq!(parse_amount("COP 42000"), dec("42000"));
    }

    #[test]
    fn test_parse_repeated_dots_fall_back_to_digits() {
        assert_eq!(parse_amount("1.234.567"), dec("1234567"));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_amount("-15.5"), dec("-15.5"));
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount("-"), Decimal::ZERO);
        assert_eq!(parse_amount("."), Decimal::ZERO);
    }

    #[test]
    fn test_format_store_amount() {
        assert_eq!(format_store_amount(dec("42000")), "42.000");
        assert_eq!(format_store_amount(dec("1234567.4")), "1.234.567");
        assert_eq!(format_store_amount(dec("999")), "999");
        assert_eq!(format_store_amount(dec("0")), "0");
        assert_eq!(format_store_amount(dec("-5000")), "-5.000");
    }

    #[test]
    fn test_format_store_amount_rounds_half_even() {
        assert_eq!(format_store_amount(dec("2.5")), "2");
        assert_eq!(format_store_amount(dec("3.5")), "4");
    }

    #[test]
    fn test_format_display_amount() {
        assert_eq!(format_display_amount(dec("10.95"), "USD"), "$10.95 USD");
        assert_eq!(format_display_amount(dec("1234.5"), "USD"), "$1,234.50 USD");
        assert_eq!(format_display_amount(dec("7"), "USD"), "$7.00 USD");
        assert_eq!(format_display_amount(dec("1000000"), "EUR"), "$1,000,000.00 EUR");
    }

    #[test]
    fn test_round_display_half_away_from_zero() {
        assert_eq!(round_display(dec("10.005")), dec("10.01"));
        assert_eq!(round_display(dec("10.004")), dec("10.00"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", '.'), "1");
        assert_eq!(group_thousands("1000", '.'), "1.000");
        assert_eq!(group_thousands("123456", ','), "123,456");
    }
}
