// src/input.rs

//! Validation of the value users paste into the chat.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Longest value accepted from the chat.
pub const MAX_INPUT_LEN: usize = 100;

static INPUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,100}$").expect("input pattern is a valid regex")
});

/// True iff `input` is 1..=100 ASCII letters, digits, `_` or `-`.
pub fn is_valid_input(input: &str) -> bool {
    INPUT_PATTERN.is_match(input)
}

/// A chat value that passed [`is_valid_input`].
///
/// The only constructor is [`RequestValue::parse`], so anything holding one
/// can write it to disk or hand it to a worker without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestValue(String);

impl RequestValue {
    pub fn parse(input: &str) -> Option<Self> {
        is_valid_input(input).then(|| Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RequestValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
