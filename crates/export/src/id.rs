/// Deterministic 32-character hex id derived from `parts`.
///
/// Rows that have no id of their own in the authoring store (tags,
/// assessment metadata, generated files) get one from this, so that
/// republishing the same tree produces the same ids.
pub fn stable_id(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let mut id = hasher.finalize().to_hex().to_string();
    id.truncate(32);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_id_is_deterministic() {
        assert_eq!(stable_id(&["tag", "math"]), stable_id(&["tag", "math"]));
        assert_eq!(stable_id(&["tag", "math"]).len(), 32);
    }

    #[test]
    fn test_part_boundaries_matter() {
        assert_ne!(stable_id(&["ab", "c"]), stable_id(&["a", "bc"]));
    }
}
