//! The locally injected fallback tag.
//!
//! `untagged` is not a Last.fm tag. It only guarantees that every event
//! carries at least one tag, so any mood or genre aggregation over tags must
//! skip it (see [`real_tags`]).

/// The single tag used when no real tags could be resolved.
pub const FALLBACK_TAG: &str = "untagged";

/// A fresh copy of the fallback tag set (`["untagged"]`).
#[must_use]
pub fn fallback_tags() -> Vec<String> {
    vec![FALLBACK_TAG.to_string()]
}

/// Returns `true` when `tags` is exactly the fallback tag set.
#[must_use]
pub fn is_fallback(tags: &[String]) -> bool {
    matches!(tags, [only] if only == FALLBACK_TAG)
}

/// Iterate over the tags that came from a real source.
pub fn real_tags(tags: &[String]) -> impl Iterator<Item = &str> {
    tags.iter()
        .map(String::as_str)
        .filter(|tag| *tag != FALLBACK_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_tags_is_single_untagged() {
        assert_eq!(fallback_tags(), vec!["untagged".to_string()]);
        assert!(is_fallback(&fallback_tags()));
    }

    #[test]
    fn test_is_fallback_rejects_other_sets() {
        assert!(!is_fallback(&[]));
        assert!(!is_fallback(&["rock".to_string()]));
        assert!(!is_fallback(&["untagged".to_string(), "rock".to_string()]));
    }

    #[test]
    fn test_real_tags_skips_fallback() {
        let tags = vec!["untagged".to_string(), "rock".to_string()];
        let real: Vec<&str> = real_tags(&tags).collect();
        assert_eq!(real, vec!["rock"]);
    }
}
