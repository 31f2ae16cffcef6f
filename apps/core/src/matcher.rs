use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

pub const DEFAULT_TOKEN: &str = "update";

static TOKEN_PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("filter tokenizer unavailable: {0}")]
    Tokenizer(String),
}

/// Compiled form of the operator's filter text.
///
/// The same predicate is applied to `"{name} {display}"` for every target kind.
#[derive(Debug, Clone)]
pub struct Matcher {
    tokens: Vec<String>,
    lowered: Vec<String>,
    pattern: Option<Regex>,
    defaulted: bool,
}

impl Matcher {
    pub fn compile(raw_filter: &str) -> Result<Self, MatcherError> {
        let trimmed = raw_filter.trim();
        let mut tokens = Vec::new();
        for token in tokenize(trimmed)? {
            if !contains_ignore_case(&tokens, &token) {
                tokens.push(token);
            }
        }

        let defaulted = tokens.is_empty();
        if defaulted {
            tokens.push(DEFAULT_TOKEN.to_string());
        }

        let pattern = if !trimmed.is_empty() && !trimmed.contains('"') {
            match RegexBuilder::new(trimmed).case_insensitive(true).build() {
                Ok(regex) => Some(regex),
                Err(error) => {
                    log::debug!("filter is not a valid pattern, using substring mode: {error}");
                    None
                }
            }
        } else {
            None
        };

        let lowered = tokens.iter().map(|t| t.to_lowercase()).collect();
        Ok(Self {
            tokens,
            lowered,
            pattern,
            defaulted,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        match &self.pattern {
            Some(pattern) => {
                pattern.is_match(text)
                    || self
                        .lowered
                        .iter()
                        .skip(1)
                        .any(|token| haystack.contains(token.as_str()))
            }
            None => self
                .lowered
                .iter()
                .any(|token| haystack.contains(token.as_str())),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn uses_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// The filter text the operator should now see, when the default token was
    /// substituted for an empty filter.
    pub fn substituted_filter(&self) -> Option<&str> {
        if self.defaulted {
            Some(DEFAULT_TOKEN)
        } else {
            None
        }
    }
}

/// Splits on whitespace, keeping `"quoted phrases"` together without their quotes.
pub fn tokenize(input: &str) -> Result<Vec<String>, MatcherError> {
    let pattern = TOKEN_PATTERN
        .get_or_init(|| Regex::new(r#""([^"]+)"|(\S+)"#))
        .as_ref()
        .map_err(|error| MatcherError::Tokenizer(error.to_string()))?;

    Ok(pattern
        .captures_iter(input)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|token| !token.is_empty())
        .collect())
}

fn contains_ignore_case(tokens: &[String], candidate: &str) -> bool {
    let lowered = candidate.to_lowercase();
    tokens.iter().any(|t| t.to_lowercase() == lowered)
}

#[cfg(test)]
mod tests {
    use super::{contains_ignore_case, tokenize};

    #[test]
    fn tokenize_keeps_quoted_phrase_whole() {
        let tokens = tokenize(r#"edge "Hesap Makinesi" teams"#).unwrap();
        assert_eq!(tokens, vec!["edge", "Hesap Makinesi", "teams"]);
    }

    #[test]
    fn tokenize_treats_unterminated_quote_as_plain_word() {
        let tokens = tokenize(r#""abc def"#).unwrap();
        assert_eq!(tokens, vec!["\"abc", "def"]);
    }

    #[test]
    fn duplicate_detection_ignores_case() {
        let tokens = vec!["Update".to_string()];
        assert!(contains_ignore_case(&tokens, "UPDATE"));
        assert!(!contains_ignore_case(&tokens, "updater"));
    }
}
