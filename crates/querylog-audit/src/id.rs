//! Correlation identifier generation.

use uuid::{Uuid, Variant, Version};

/// Generate a random version-4 UUID in canonical dashed lowercase form.
pub fn generate() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Whether `id` is a canonical dashed version-4 UUID.
pub fn is_v4(id: &str) -> bool {
    if id.len() != 36 {
        return false;
    }
    match Uuid::try_parse(id) {
        Ok(uuid) => uuid.get_version() == Some(Version::Random) && uuid.get_variant() == Variant::RFC4122,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_have_v4_layout() {
        let id = generate();
        assert!(is_v4(&id), "not a v4 uuid: {}", id);

        let bytes: Vec<char> = id.chars().collect();
        assert_eq!(bytes[8], '-');
        assert_eq!(bytes[14], '4');
        assert!(matches!(bytes[19], '8' | '9' | 'a' | 'b'));
    }

    #[test]
    fn test_no_duplicates_in_ten_thousand() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
        assert!(ids.iter().all(|id| is_v4(id)));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(!is_v4("not-a-uuid"));
        // Version 1 layout.
        assert!(!is_v4("c232ab00-9414-11ec-b3c8-9e6bdeced846"));
        // Simple (undashed) form.
        assert!(!is_v4(&Uuid::new_v4().simple().to_string()));
    }
}
