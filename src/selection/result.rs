//! Result types for selection

use crate::store::TokenRecord;

/// Tokens of one batch that passed every check, in store order
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Matched tokens
    pub tokens: Vec<TokenRecord>,
    /// Number of tokens examined in the batch
    pub scanned: usize,
}

impl MatchResult {
    /// Number of tokens matched
    pub fn matched(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.serial.as_str())
    }
}

impl IntoIterator for MatchResult {
    type Item = TokenRecord;
    type IntoIter = std::vec::IntoIter<TokenRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_result_counts() {
        let result = MatchResult {
            tokens: vec![TokenRecord::new("A", "hotp")],
            scanned: 4,
        };
        assert_eq!(result.matched(), 1);
        assert_eq!(result.serials().collect::<Vec<_>>(), vec!["A"]);
        assert!(MatchResult::default().is_empty());
    }
}
