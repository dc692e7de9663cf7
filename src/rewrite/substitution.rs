use crate::error::{Error, Result};
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;

/// Literal, non-overlapping, left-to-right byte substitution
///
/// The needle is escaped before compiling, so it never acts as a pattern.
/// Matching runs on raw bytes, so it applies to any entry regardless of
/// encoding.
#[derive(Debug, Clone)]
pub struct Substitution {
    old: Regex,
    new: Vec<u8>,
}

impl Substitution {
    /// Replace every `old` with `new`; `Ok(None)` when `old` is empty
    ///
    /// # Errors
    /// A config error when `old` is too large to compile into a matcher.
    pub fn new(old: &str, new: &str) -> Result<Option<Self>> {
        if old.is_empty() {
            return Ok(None);
        }
        let matcher = Regex::new(&regex::escape(old))
            .map_err(|e| Error::config("rewrite.old", format!("unusable literal: {}", e)))?;
        Ok(Some(Self {
            old: matcher,
            new: new.as_bytes().to_vec(),
        }))
    }

    /// Apply to `content`, borrowing it unchanged when there is no match
    pub fn apply<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        self.old.replace_all(content, NoExpand(&self.new))
    }
}
