// ── Campaign tag codec ──
//
// The panel has no reliable server-side grouping, so campaign membership is
// carried in the generated username: `<prefix><suffix>-<tag>`. Everything
// that reads or writes that convention goes through `TagCodec`, so a
// panel-side tag field can replace it without touching scan/provision/retire.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Longest tag accepted by [`is_valid_tag`].
pub const MAX_TAG_LEN: usize = 64;

/// Length of the random per-credential suffix.
pub const SUFFIX_LEN: usize = 8;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// ── Validation ───────────────────────────────────────────────────────

/// Tags are 1..=64 characters of ASCII letters, digits, `_` and `-`.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= MAX_TAG_LEN
        && tag
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Uppercase letters and turn whitespace into `_`. Does not validate.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                '_'
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn rejection_reason(tag: &str) -> String {
    if tag.is_empty() {
        "tag is empty".into()
    } else if tag.len() > MAX_TAG_LEN {
        format!("tag is longer than {MAX_TAG_LEN} characters")
    } else {
        "only ASCII letters, digits, '_' and '-' are allowed".into()
    }
}

// ── Policy ───────────────────────────────────────────────────────────

/// How operator input becomes a campaign tag.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TagPolicy {
    /// Accept the input verbatim or reject it.
    #[default]
    Strict,
    /// Uppercase and replace whitespace first, then validate.
    Normalize,
}

impl TagPolicy {
    /// Turn raw operator input into a valid tag.
    pub fn apply(self, raw: &str) -> Result<String, CoreError> {
        let tag = match self {
            Self::Strict => raw.to_owned(),
            Self::Normalize => normalize_tag(raw),
        };

        if is_valid_tag(&tag) {
            Ok(tag)
        } else {
            Err(CoreError::InvalidTag {
                reason: rejection_reason(&tag),
                tag,
            })
        }
    }
}

// ── Codec ────────────────────────────────────────────────────────────

/// Encodes campaign identity into credential names and recovers it.
pub trait TagCodec: Send + Sync {
    /// A fresh, unique-enough credential name for `tag`.
    fn generate_name(&self, tag: &str) -> String;

    /// The campaign tag carried by `name`, if it follows the convention.
    fn extract_tag(&self, name: &str) -> Option<String>;
}

/// `<prefix><8 random chars>-<tag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixCodec {
    prefix: String,
}

impl PrefixCodec {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixCodec {
    fn default() -> Self {
        Self::new("promo-")
    }
}

impl TagCodec for PrefixCodec {
    fn generate_name(&self, tag: &str) -> String {
        format!("{}{}-{tag}", self.prefix, random_suffix())
    }

    // The suffix never contains '-', so the first hyphen after the prefix
    // separates it from the tag and hyphenated tags survive intact.
    fn extract_tag(&self, name: &str) -> Option<String> {
        let rest = name.strip_prefix(self.prefix.as_str())?;
        let (_suffix, tag) = rest.split_once('-')?;
        if tag.is_empty() {
            return None;
        }
        Some(tag.to_owned())
    }
}

/// Eight lowercase ASCII alphanumerics, drawn independently per call.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET.get(idx).copied().map_or('x', char::from)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_letters_digits_underscore_hyphen() {
        for tag in ["summer", "SUMMER_2024", "black-friday", "a", "x-y_z-9"] {
            assert!(is_valid_tag(tag), "{tag} should be valid");
        }
    }

    #[test]
    fn rejects_empty_spaces_and_symbols() {
        for tag in ["", "two words", "promo!", "тег", "tab\there", "a/b", "a.b"] {
            assert!(!is_valid_tag(tag), "{tag:?} should be rejected");
        }
    }

    #[test]
    fn rejects_tags_over_max_length() {
        assert!(is_valid_tag(&"a".repeat(MAX_TAG_LEN)));
        assert!(!is_valid_tag(&"a".repeat(MAX_TAG_LEN + 1)));
    }

    #[test]
    fn normalize_uppercases_and_replaces_whitespace() {
        assert_eq!(normalize_tag("summer sale 2024"), "SUMMER_SALE_2024");
        assert_eq!(normalize_tag("  new\tyear "), "NEW_YEAR");
    }

    #[test]
    fn strict_policy_rejects_what_normalize_repairs() {
        assert!(TagPolicy::Strict.apply("summer sale").is_err());
        assert_eq!(TagPolicy::Normalize.apply("summer sale").unwrap(), "SUMMER_SALE");
        assert_eq!(TagPolicy::Strict.apply("summer").unwrap(), "summer");
    }

    #[test]
    fn normalize_policy_still_validates() {
        let err = TagPolicy::Normalize.apply("promo!").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTag { .. }));
        assert!(TagPolicy::Normalize.apply("   ").is_err());
    }

    #[test]
    fn policy_parses_from_snake_case() {
        assert_eq!("normalize".parse::<TagPolicy>().unwrap(), TagPolicy::Normalize);
        assert_eq!(TagPolicy::Strict.to_string(), "strict");
    }

    #[test]
    fn generated_names_follow_convention() {
        let codec = PrefixCodec::default();
        let name = codec.generate_name("summer");
        let suffix = name
            .strip_prefix("promo-")
            .and_then(|rest| rest.strip_suffix("-summer"))
            .unwrap();

        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn round_trip_including_hyphenated_tags() {
        let codec = PrefixCodec::default();
        for tag in ["summer", "black-friday", "a-b-c-d", "X_1", "-lead", "trail-"] {
            let name = codec.generate_name(tag);
            assert_eq!(codec.extract_tag(&name).as_deref(), Some(tag), "name {name}");
        }
    }

    #[test]
    fn round_trip_with_hyphenated_prefix() {
        let codec = PrefixCodec::new("vpn-promo-");
        let name = codec.generate_name("winter-2025");
        assert_eq!(codec.extract_tag(&name).as_deref(), Some("winter-2025"));
    }

    #[test]
    fn extract_tag_requires_prefix_and_both_segments() {
        let codec = PrefixCodec::default();
        assert_eq!(codec.extract_tag("alice"), None);
        assert_eq!(codec.extract_tag("promo-abcd1234"), None);
        assert_eq!(codec.extract_tag("promo-abcd1234-"), None);
        assert_eq!(codec.extract_tag("trial-abcd1234-summer"), None);
        assert_eq!(
            codec.extract_tag("promo-ab12cd34-summer").as_deref(),
            Some("summer")
        );
    }

    #[test]
    fn suffixes_differ_between_calls() {
        let a = random_suffix();
        let b = random_suffix();
        let c = random_suffix();
        assert!(a != b || b != c);
    }
}
