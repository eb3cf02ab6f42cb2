use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::clock::Clock;
use super::provider::Provider;
use super::refresh;
use super::store::TokenStore;
use super::token::Token;
use super::types::RefreshOutcome;
use crate::error::Result;
use crate::http_client::Transport;

/// Token manager
/// Resolves a usable token per subject: cached, refreshed, or freshly logged in
pub struct TokenManager {
    /// Token cache
    store: Arc<dyn TokenStore>,

    /// Transport for login and refresh requests
    transport: Arc<dyn Transport>,

    /// Time source for issuance and expiry
    clock: Arc<dyn Clock>,

    /// One lock per subject around resolve -> refresh -> save
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get a valid token for `subject`, logging in or refreshing if necessary.
    ///
    /// A refresh rejected with 401 deletes the cached token and re-acquires
    /// exactly once; that second acquisition is not refreshed again.
    pub async fn get_access_token(&self, provider: &Provider, subject: &str) -> Result<Token> {
        let lock = self.subject_lock(subject);
        let _guard = lock.lock().await;

        let token = self.acquire(provider, subject).await?;
        if !token.is_expired(self.clock.now()) {
            return Ok(token);
        }

        tracing::debug!(
            subject = %subject,
            expires_at = ?token.expires_at(),
            "Cached token expired"
        );

        match refresh::refresh(&*self.transport, provider, &*self.clock, &token).await? {
            RefreshOutcome::Refreshed(refreshed) => {
                self.store.save(subject, &refreshed)?;
                Ok(refreshed)
            }
            RefreshOutcome::Rejected => {
                self.store.delete(subject, &token)?;
                self.acquire(provider, subject).await
            }
        }
    }

    /// Drop a token the server refused
    pub fn invalidate(&self, subject: &str, token: &Token) -> Result<()> {
        tracing::warn!(subject = %subject, "Deleting revoked access token");
        self.store.delete(subject, token)
    }

    /// Delete every cached token of `subject`, returning how many were removed
    pub fn revoke_all(&self, subject: &str) -> Result<usize> {
        let tokens = self.store.list(subject)?;
        for token in &tokens {
            self.store.delete(subject, token)?;
        }
        Ok(tokens.len())
    }

    /// First cached token wins; otherwise log in and cache the result
    async fn acquire(&self, provider: &Provider, subject: &str) -> Result<Token> {
        if let Some(token) = self.store.list(subject)?.into_iter().next() {
            tracing::debug!(subject = %subject, "Using cached access token");
            return Ok(token);
        }

        tracing::debug!(subject = %subject, "No cached access token");
        let token = refresh::login(&*self.transport, provider, &*self.clock).await?;
        self.store.save(subject, &token)?;
        Ok(token)
    }

    fn subject_lock(&self, subject: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(subject.to_string())
            .or_default()
            .value()
            .clone()
    }
}
