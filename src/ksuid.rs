/// K-sortable identifiers
///
/// 27-character base62 KSUIDs: a seconds timestamp followed by 16 random
/// bytes, so string order follows creation order at one-second resolution.
use svix_ksuid::{Ksuid, KsuidLike};

/// Generate a new identifier for the current instant
pub fn new_id() -> String {
    Ksuid::new(None, None).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), 27);
        assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_new_id_parses_back() {
        let id = new_id();
        let parsed: Ksuid = id.parse().unwrap();
        assert_eq!(parsed.to_string(), id);
    }

    #[test]
    fn test_ids_are_distinct() {
        assert_ne!(new_id(), new_id());
    }
}
