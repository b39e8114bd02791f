// SPDX-License-Identifier: MIT

//! Bearer token file parsing (§6): newline-delimited
//! `<name> <token> <optional comment>`. Lines starting with `#`, blank
//! lines, and lines with fewer than two whitespace-separated fields are
//! skipped with a warning rather than rejected — a typo'd line shouldn't
//! take the whole server down.

use std::collections::HashMap;

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '-'))
}

/// The parsed contents of a token file: token -> name, for authenticating
/// bearer values carried on every request.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    by_token: HashMap<String, String>,
}

impl TokenTable {
    pub fn parse(contents: &str) -> Self {
        let mut by_token = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            let (Some(name), Some(token)) = (fields.next(), fields.next()) else {
                tracing::warn!(line = lineno + 1, "skipping malformed token file line");
                continue;
            };
            if !is_valid_token(token) {
                tracing::warn!(line = lineno + 1, name, "skipping token with invalid alphabet");
                continue;
            }
            by_token.insert(token.to_string(), name.to_string());
        }
        Self { by_token }
    }

    /// The name the token authenticates as, if it's valid.
    pub fn authenticate(&self, token: &str) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }
}
