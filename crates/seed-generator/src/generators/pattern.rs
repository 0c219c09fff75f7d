//! Text patterns with placeholders.
//!
//! - `{index}`: row index within the table pass
//! - `{uuid}`: UUID drawn from the seeded RNG
//! - `{rand:N}`: N random digits, first digit non-zero
//!
//! Anything else between braces is copied through unchanged.

use super::uuid::random_uuid;
use rand::Rng;
use seed_core::SeedValue;

/// Expand `pattern` for row `index`.
pub fn generate_pattern<R: Rng>(pattern: &str, rng: &mut R, index: u64) -> SeedValue {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let token = &rest[open..];
        let Some(close) = token.find('}') else {
            out.push_str(token);
            return SeedValue::Text(out);
        };

        match expand(&token[1..close], rng, index) {
            Some(expanded) => out.push_str(&expanded),
            None => out.push_str(&token[..=close]),
        }
        rest = &token[close + 1..];
    }

    out.push_str(rest);
    SeedValue::Text(out)
}

fn expand<R: Rng>(placeholder: &str, rng: &mut R, index: u64) -> Option<String> {
    match placeholder {
        "index" => Some(index.to_string()),
        "uuid" => Some(random_uuid(rng).to_string()),
        other => {
            let digits: usize = other.strip_prefix("rand:")?.parse().ok()?;
            Some(random_digits(rng, digits))
        }
    }
}

fn random_digits<R: Rng>(rng: &mut R, digits: usize) -> String {
    (0..digits)
        .map(|i| char::from(b'0' + rng.gen_range(u8::from(i == 0)..10)))
        .collect()
}
