//! UUID value generator.

use rand::Rng;
use seed_core::SeedValue;
use uuid::Uuid;

/// Random v4 UUID drawn from the provided RNG.
pub fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    // Set version (4) and variant (RFC 4122) bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Generate a UUID v4 as text.
pub fn generate_uuid_v4<R: Rng>(rng: &mut R) -> SeedValue {
    SeedValue::Text(random_uuid(rng).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uuid_deterministic() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        assert_eq!(generate_uuid_v4(&mut rng1), generate_uuid_v4(&mut rng2));
    }

    #[test]
    fn test_uuid_version() {
        let mut rng = StdRng::seed_from_u64(42);
        let uuid = random_uuid(&mut rng);
        assert_eq!(uuid.get_version_num(), 4);
        assert_ne!(uuid, random_uuid(&mut rng));
    }
}
