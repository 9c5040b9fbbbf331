//! Shared utilities: timestamps, identifiers, payload digests.

mod digest;
mod timestamps;

pub use digest::{canonical_json, payload_digest};
pub use timestamps::{iso_timestamp, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a fresh v4 UUID string.
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
