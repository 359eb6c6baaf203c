use crate::error::SourceError;
use globset::{GlobBuilder, GlobMatcher};
use std::ffi::OsStr;
use std::fmt;

/// Case-insensitive file name pattern where `*` matches any run of characters and `?` any
/// single character. Every other character is literal.
#[derive(Clone)]
pub struct SearchPattern {
    pattern: String,
    matcher: GlobMatcher,
}

impl SearchPattern {
    pub fn new(pattern: &str) -> Result<Self, SourceError> {
        let invalid = |reason: String| SourceError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let pattern = pattern.trim_end();
        if pattern.trim().is_empty() {
            return Err(invalid("pattern is empty, use * to match every file".to_string()));
        }
        if let Some((position, c)) = pattern
            .char_indices()
            .find(|(_, c)| matches!(c, '/' | '\\' | '\0'))
        {
            return Err(invalid(format!("invalid character {c:?} at position {position}")));
        }

        let mut glob = String::with_capacity(pattern.len() + 8);
        for c in pattern.chars() {
            match c {
                '*' | '?' => glob.push(c),
                '[' | ']' | '{' | '}' => {
                    glob.push('[');
                    glob.push(c);
                    glob.push(']');
                }
                _ => glob.push(c),
            }
        }

        let matcher = GlobBuilder::new(&glob)
            .case_insensitive(true)
            .literal_separator(true)
            .backslash_escape(false)
            .build()
            .map_err(|err| invalid(err.to_string()))?
            .compile_matcher();

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Pattern matching every file name.
    #[must_use]
    pub fn any() -> Self {
        Self::new("*").unwrap_or_else(|_| unreachable!("'*' is a valid pattern"))
    }

    #[must_use]
    pub fn is_match(&self, file_name: impl AsRef<OsStr>) -> bool {
        self.matcher.is_match(file_name.as_ref())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl fmt::Debug for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SearchPattern").field(&self.pattern).finish()
    }
}
