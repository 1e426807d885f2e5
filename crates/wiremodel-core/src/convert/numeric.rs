//! Number parsing and printing with the leniency wire payloads expect
//!
//! Parsing accepts the longest numeric prefix of a string (`"298---343242"` is
//! `298`), and printing never falls back to scientific notation.

/// Parse the longest leading decimal literal of `text`.
///
/// Leading whitespace and a sign are accepted, as is an `Infinity` literal.
/// Returns `None` when no digits can be read.
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut negative = false;

    if let Some(&sign) = bytes.first() {
        if sign == b'+' || sign == b'-' {
            negative = sign == b'-';
            pos = 1;
        }
    }

    if text[pos..].starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &text[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_digits = &text[frac_start..end];
        pos = end;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    // The exponent only counts when at least one digit follows it
    let mut exponent = "";
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut end = pos + 1;
        if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            exponent = &text[pos + 1..end];
        }
    }

    let mut literal = String::with_capacity(int_digits.len() + frac_digits.len() + 8);
    if negative {
        literal.push('-');
    }
    literal.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        literal.push('.');
        literal.push_str(frac_digits);
    }
    if !exponent.is_empty() {
        literal.push('e');
        literal.push_str(exponent);
    }
    literal.parse::<f64>().ok()
}

/// Print a number as a plain decimal: sixteen fixed fraction digits with the
/// trailing zeros trimmed, and large magnitudes written out in full
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.abs() >= 1e21 {
        return format!("{}", n);
    }
    trim_fraction_zeros(format!("{:.16}", n))
}

fn trim_fraction_zeros(mut fixed: String) -> String {
    if fixed.contains('.') {
        let trimmed_len = fixed.trim_end_matches('0').trim_end_matches('.').len();
        fixed.truncate(trimmed_len);
    }
    if fixed == "-0" {
        return "0".to_string();
    }
    fixed
}
