use crate::error::DurationError;

const UNITS: [(char, u64); 5] = [
    ('s', 1),
    ('m', 60),
    ('h', 3600),
    ('d', 86_400),
    ('w', 604_800),
];

/// Parse a human readable duration into seconds.
///
/// Accepts plain seconds (`"45"`) or an integer followed by one unit
/// (`"336h"`, `"30d"`). Signs, fractions and whitespace are rejected.
pub fn parse_duration(input: &str) -> Result<u64, DurationError> {
    let invalid = || DurationError(input.to_string());

    if is_digits(input) {
        return input.parse().map_err(|_| invalid());
    }

    let mut chars = input.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let amount = chars.as_str();
    if !is_digits(amount) {
        return Err(invalid());
    }

    let multiplier = UNITS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, m)| *m)
        .ok_or_else(invalid)?;

    amount
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
