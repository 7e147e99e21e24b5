/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate an opaque resource ID (UUID v4, no table prefix).
///
/// Contract and cosigner rows use these as primary keys; the human-readable
/// business number is minted separately at finalization and never doubles
/// as a storage key.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        let t = now_millis();
        // 2024-01-01 as a sanity floor
        assert!(t > 1_704_067_200_000);
    }

    #[test]
    fn test_new_id_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
