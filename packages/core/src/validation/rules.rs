//! Named predicate + message pairs for form fields.
//!
//! Rules are pure: the same value always yields the same verdict. A missing
//! field is `None`.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

pub const PASSWORD_MIN_LENGTH: usize = 8;

type Check = Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Rule {
    name: &'static str,
    message: String,
    check: Check,
}

impl Rule {
    pub fn new<F>(name: &'static str, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            message: message.into(),
            check: Arc::new(check),
        }
    }

    /// Replace the default message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn test(&self, value: Option<&str>) -> bool {
        (self.check)(value)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Rejects missing, empty and whitespace-only values.
pub fn required() -> Rule {
    Rule::new("required", "This field is required", |value| {
        value.map_or(false, |v| !v.trim().is_empty())
    })
}

pub fn email() -> Rule {
    Rule::new("email", "Please enter a valid email", |value| {
        value.map_or(false, |v| EMAIL_PATTERN.is_match(v))
    })
}

pub fn min_length(min: usize) -> Rule {
    Rule::new(
        "minLength",
        format!("Must be at least {} characters", min),
        move |value| value.map_or(false, |v| !v.is_empty() && char_len(v) >= min),
    )
}

/// Missing or empty values pass; pair with [`required`] when needed.
pub fn max_length(max: usize) -> Rule {
    Rule::new(
        "maxLength",
        format!("Must be no more than {} characters", max),
        move |value| value.map_or(true, |v| char_len(v) <= max),
    )
}

pub fn password() -> Rule {
    Rule::new(
        "password",
        format!("Password must be at least {} characters", PASSWORD_MIN_LENGTH),
        |value| value.map_or(false, |v| char_len(v) >= PASSWORD_MIN_LENGTH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_and_missing() {
        let rule = required();
        assert!(!rule.test(Some("")));
        assert!(!rule.test(Some("   ")));
        assert!(!rule.test(None));
        assert!(rule.test(Some("Budi")));
        assert!(rule.test(Some(" x ")));
    }

    #[test]
    fn email_accepts_simple_addresses() {
        let rule = email();
        assert!(rule.test(Some("a@b.co")));
        assert!(rule.test(Some("crew.member@elkkana.id")));
        assert!(!rule.test(Some("a@b")));
        assert!(!rule.test(Some("@b.com")));
        assert!(!rule.test(Some("")));
        assert!(!rule.test(Some("a b@c.com")));
        assert!(!rule.test(None));
    }

    #[test]
    fn min_length_boundary() {
        let rule = min_length(5);
        assert!(!rule.test(Some("abcd")));
        assert!(rule.test(Some("abcde")));
        assert!(rule.test(Some("abcdef")));
        assert!(!rule.test(None));
        assert_eq!(rule.message(), "Must be at least 5 characters");
    }

    #[test]
    fn max_length_allows_missing_values() {
        let rule = max_length(3);
        assert!(rule.test(None));
        assert!(rule.test(Some("")));
        assert!(rule.test(Some("abc")));
        assert!(!rule.test(Some("abcd")));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert!(max_length(4).test(Some("Ñoño")));
        assert!(min_length(4).test(Some("Ñoño")));
    }

    #[test]
    fn password_needs_eight_characters() {
        let rule = password();
        assert!(!rule.test(None));
        assert!(!rule.test(Some("")));
        assert!(!rule.test(Some("1234567")));
        assert!(rule.test(Some("12345678")));
        assert_eq!(rule.message(), "Password must be at least 8 characters");
    }

    #[test]
    fn custom_message_replaces_default() {
        let rule = required().with_message("Full name is required");
        assert_eq!(rule.message(), "Full name is required");
        assert_eq!(rule.name(), "required");
    }
}
