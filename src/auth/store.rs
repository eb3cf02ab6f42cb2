// Token storage capability and the in-memory backend

use dashmap::DashMap;
use std::sync::Arc;

use super::token::Token;
use crate::error::Result;

/// Storage for cached tokens, keyed by subject (user identifier).
///
/// Pure storage with no policy. Callers sharing a store across tasks must
/// serialize the resolve/refresh/save sequence themselves.
pub trait TokenStore: Send + Sync {
    /// Cached tokens for `subject`, most recently usable first. Empty means
    /// the subject has to log in.
    fn list(&self, subject: &str) -> Result<Vec<Token>>;

    /// Persist `token` as the cached token for `subject`, replacing any other
    fn save(&self, subject: &str, token: &Token) -> Result<()>;

    /// Remove `token` from the cache. Removing an absent token is a no-op.
    fn delete(&self, subject: &str, token: &Token) -> Result<()>;
}

/// Thread-safe in-process token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<DashMap<String, Vec<Token>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subjects with at least one cached token
    pub fn len(&self) -> usize {
        self.tokens.iter().filter(|entry| !entry.value().is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for MemoryTokenStore {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn list(&self, subject: &str) -> Result<Vec<Token>> {
        Ok(self
            .tokens
            .get(subject)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    fn save(&self, subject: &str, token: &Token) -> Result<()> {
        self.tokens.insert(subject.to_string(), vec![token.clone()]);
        Ok(())
    }

    fn delete(&self, subject: &str, token: &Token) -> Result<()> {
        if let Some(mut entry) = self.tokens.get_mut(subject) {
            entry.retain(|cached| cached != token);
        }
        Ok(())
    }
}
