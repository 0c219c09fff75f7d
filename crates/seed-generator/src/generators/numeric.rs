//! Numeric value generators.

use rand::Rng;
use seed_core::SeedValue;

/// Generate a random integer in the given range (inclusive).
pub fn generate_int_range<R: Rng>(rng: &mut R, min: i64, max: i64) -> SeedValue {
    if min >= max {
        return SeedValue::Integer(min);
    }
    SeedValue::Integer(rng.gen_range(min..=max))
}

/// Generate a random float in the given range (inclusive), rounded to two
/// decimal places so it also fits `numeric(p, 2)` columns.
pub fn generate_float_range<R: Rng>(rng: &mut R, min: f64, max: f64) -> SeedValue {
    if min >= max {
        return SeedValue::Float(min);
    }
    let value: f64 = rng.gen_range(min..=max);
    SeedValue::Float((value * 100.0).round() / 100.0)
}
