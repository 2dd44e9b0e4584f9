//! Pattern dispatch and the per-pattern transforms.
//!
//! Lengths are counted in Unicode scalar values, so a mask of `"Zoë"` is
//! three mask characters wide. Patterns that parse digits (`phone`, `ssn`,
//! `credit-card`) fall back to "mask all but the last four characters" when
//! the digit count does not fit the expected shape.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use custodia_types::MaskPattern;

/// Width of a full mask applied to an empty value.
pub const DEFAULT_FULL_WIDTH: usize = 8;

/// Local part split into first char, lazy middle, optional last char.
const EMAIL_PATTERN: &str = r"^(.)(.*?)(.?)@(.+)$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// Mask a JSON value for display.
///
/// `null` passes through unchanged. Strings are masked directly; numbers
/// and booleans are stringified first; arrays and objects are rendered as
/// compact JSON and then masked as a whole.
pub fn mask_value(value: &Value, pattern: MaskPattern, mask_char: char) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(mask_str(s, pattern, mask_char)),
        Value::Number(n) => Value::String(mask_str(&n.to_string(), pattern, mask_char)),
        Value::Bool(b) => Value::String(mask_str(&b.to_string(), pattern, mask_char)),
        Value::Array(_) | Value::Object(_) => {
            Value::String(mask_str(&value.to_string(), pattern, mask_char))
        }
    }
}

/// Mask a string with the given pattern.
pub fn mask_str(value: &str, pattern: MaskPattern, mask_char: char) -> String {
    match pattern {
        MaskPattern::Full => mask_full(value, mask_char),
        MaskPattern::Partial => mask_partial(value, mask_char),
        MaskPattern::Hash => format!("[REDACTED-{}]", value.chars().count()),
        MaskPattern::Email => mask_email(value, mask_char),
        MaskPattern::Phone => mask_phone(value, mask_char),
        MaskPattern::Ssn => mask_ssn(value, mask_char),
        MaskPattern::CreditCard => mask_credit_card(value, mask_char),
    }
}

fn repeat(mask_char: char, n: usize) -> String {
    std::iter::repeat(mask_char).take(n).collect()
}

fn mask_full(value: &str, mask_char: char) -> String {
    match value.chars().count() {
        0 => repeat(mask_char, DEFAULT_FULL_WIDTH),
        n => repeat(mask_char, n),
    }
}

fn mask_partial(value: &str, mask_char: char) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return mask_full(value, mask_char);
    }
    let mut out = String::with_capacity(value.len());
    out.extend(&chars[..2]);
    out.push_str(&repeat(mask_char, chars.len() - 4));
    out.extend(&chars[chars.len() - 2..]);
    out
}

/// Keep the last four raw characters. Values of four characters or fewer
/// are fully masked so the result never equals the input.
fn mask_all_but_last4(value: &str, mask_char: char) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return mask_full(value, mask_char);
    }
    let mut out = repeat(mask_char, chars.len() - 4);
    out.extend(&chars[chars.len() - 4..]);
    out
}

fn digits_of(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn mask_email(value: &str, mask_char: char) -> String {
    let Some(caps) = email_regex().and_then(|re| re.captures(value)) else {
        return mask_full(value, mask_char);
    };
    let first = &caps[1];
    let middle = &caps[2];
    let last = &caps[3];
    let domain = &caps[4];

    let local = match (middle.is_empty(), last.is_empty()) {
        // "a@x": the only local char is hidden.
        (true, true) => repeat(mask_char, first.chars().count()),
        // "ab@x": keep the first, hide the second.
        (true, false) => format!("{first}{}", repeat(mask_char, last.chars().count())),
        _ => format!("{first}{}{last}", repeat(mask_char, middle.chars().count())),
    };
    format!("{local}@{domain}")
}

fn mask_phone(value: &str, mask_char: char) -> String {
    let digits = digits_of(value);
    let m3 = repeat(mask_char, 3);
    match digits.len() {
        10 => format!("({m3}) {m3}-{}", &digits[6..]),
        11 => format!("{} ({m3}) {m3}-{}", &digits[..1], &digits[7..]),
        _ => mask_all_but_last4(value, mask_char),
    }
}

fn mask_ssn(value: &str, mask_char: char) -> String {
    let digits = digits_of(value);
    if digits.len() == 9 {
        format!(
            "{}-{}-{}",
            repeat(mask_char, 3),
            repeat(mask_char, 2),
            &digits[5..]
        )
    } else {
        mask_all_but_last4(value, mask_char)
    }
}

fn mask_credit_card(value: &str, mask_char: char) -> String {
    let digits = digits_of(value);
    if digits.len() == 16 {
        let group = repeat(mask_char, 4);
        format!("{group} {group} {group} {}", &digits[12..])
    } else {
        mask_all_but_last4(value, mask_char)
    }
}
