//! Topic validation and normalization.
//!
//! Topics are path-shaped strings (`home/livingroom/`) limited to letters,
//! digits and `- _ . /`. The normalized form always ends with a trailing
//! slash so that ZeroMQ prefix filtering matches on whole path segments.
//!
//! Validation is a pure function of the input string and never touches a
//! socket, which keeps it trivially unit-testable.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BusError, Result};

static TOPIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\-_./]+$").expect("topic pattern is a valid regex"));

/// Validate a raw topic and return its normalized form.
///
/// Accepts non-empty strings matching `[a-zA-Z0-9-_./]+`; anything else
/// (empty, whitespace, other characters) is [`BusError::InvalidTopic`].
/// The returned topic always ends with `/`; normalization is idempotent.
pub fn validate(raw: &str) -> Result<String> {
    if !TOPIC_PATTERN.is_match(raw) {
        return Err(BusError::InvalidTopic);
    }
    if raw.ends_with('/') {
        Ok(raw.to_owned())
    } else {
        Ok(format!("{}/", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn valid_topics_are_normalized_with_trailing_slash() {
        assert_eq!(validate("topic").unwrap(), "topic/");
        assert_eq!(validate("home/livingroom").unwrap(), "home/livingroom/");
        assert_eq!(validate("a-b_c.d/e").unwrap(), "a-b_c.d/e/");
        assert_eq!(validate("5562").unwrap(), "5562/");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = validate("home/livingroom").unwrap();
        let twice = validate(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn already_terminated_topics_are_unchanged() {
        assert_eq!(validate("topic/").unwrap(), "topic/");
    }

    #[test]
    fn empty_topic_is_rejected() {
        assert!(matches!(validate(""), Err(BusError::InvalidTopic)));
    }

    #[test]
    fn whitespace_is_rejected() {
        assert!(validate("home livingroom").is_err());
        assert!(validate(" topic").is_err());
        assert!(validate("topic\t").is_err());
        assert!(validate("topic\n").is_err());
    }

    #[test]
    fn invalid_characters_are_rejected() {
        for raw in ["topic!", "home#room", "a,b", "topic$", "höme", "topic:"] {
            let result = validate(raw);
            assert_eq!(
                ErrorCode::of(&result),
                ErrorCode::InvalidTopic,
                "expected {:?} to be rejected",
                raw
            );
        }
    }
}
