//! Storage key validation.
//!
//! Valid keys:
//! - Must be non-empty and at most 200 bytes
//! - May only contain ASCII letters, digits, `-`, `_` and `.`
//! - Must not start with `.`
//! - Must not contain `..`

use crate::error::{MetaError, MetaResult};

const MAX_KEY_LEN: usize = 200;

/// Validate a namespace storage key, returning `Ok(())` if valid.
///
/// Keys double as file names in [`FsMetadataStore`](crate::FsMetadataStore),
/// so the accepted character set is deliberately narrow.
///
/// # Examples
///
/// ```
/// use folio_meta::names::validate_storage_key;
///
/// assert!(validate_storage_key("guest").is_ok());
/// assert!(validate_storage_key("user-user_ab12cd34e").is_ok());
/// assert!(validate_storage_key("").is_err());
/// assert!(validate_storage_key("../etc").is_err());
/// ```
pub fn validate_storage_key(key: &str) -> MetaResult<()> {
    let invalid = |reason: &str| {
        Err(MetaError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };

    if key.is_empty() {
        return invalid("key must not be empty");
    }
    if key.len() > MAX_KEY_LEN {
        return invalid("key is too long");
    }
    if let Some(ch) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return invalid(&format!("contains forbidden character: {ch:?}"));
    }
    if key.starts_with('.') {
        return invalid("must not start with '.'");
    }
    if key.contains("..") {
        return invalid("must not contain '..'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_namespace_keys() {
        assert!(validate_storage_key("guest").is_ok());
        assert!(validate_storage_key("user-abc_123").is_ok());
        assert!(validate_storage_key("user-a.b").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            validate_storage_key(""),
            Err(MetaError::InvalidKey { .. })
        ));
    }

    #[test]
    fn rejects_separators_and_spaces() {
        assert!(validate_storage_key("user-a/b").is_err());
        assert!(validate_storage_key("user-a\\b").is_err());
        assert!(validate_storage_key("user a").is_err());
    }

    #[test]
    fn rejects_dot_prefix_and_traversal() {
        assert!(validate_storage_key(".hidden").is_err());
        assert!(validate_storage_key("user-..").is_err());
    }

    #[test]
    fn rejects_overlong() {
        assert!(validate_storage_key(&"a".repeat(201)).is_err());
        assert!(validate_storage_key(&"a".repeat(200)).is_ok());
    }
}
