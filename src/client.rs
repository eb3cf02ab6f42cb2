use chrono::NaiveDateTime;
use reqwest::StatusCode;
use std::sync::Arc;

use crate::auth::{
    bearer, Clock, Provider, TokenManager, TokenStore, API_KEY_HEADER, AUTHENTICATION_HEADER,
};
use crate::error::{KronosError, Result};
use crate::http_client::{HttpRequest, HttpResponse, Transport};

/// Authenticated client for the Kronos REST API.
///
/// Every call resolves a token for the configured subject (cached, refreshed
/// or freshly logged in), attaches the `Authentication` and `Api-Key` headers
/// and sends the request. A 401 on the request itself deletes the cached
/// token and fails the call with [`KronosError::TokenRevoked`]; the request is
/// not replayed.
pub struct KronosClient {
    tokens: TokenManager,
    transport: Arc<dyn Transport>,
    provider: Option<Provider>,
    subject: Option<String>,
}

impl KronosClient {
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens: TokenManager::new(store, Arc::clone(&transport), clock),
            transport,
            provider: None,
            subject: None,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = Some(provider);
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    pub fn provider(&self) -> Result<&Provider> {
        self.provider
            .as_ref()
            .ok_or_else(|| KronosError::Configuration("provider not set".to_string()))
    }

    /// User identifier tokens are cached under
    pub fn subject(&self) -> Result<&str> {
        self.subject
            .as_deref()
            .ok_or_else(|| KronosError::Configuration("subject (user id) not set".to_string()))
    }

    /// Current time according to the injected clock
    pub fn now(&self) -> NaiveDateTime {
        self.tokens.clock().now()
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        self.tokens.store()
    }

    /// Absolute URL for a resource path, placeholders substituted
    pub fn resolve_url(&self, path: &str) -> Result<String> {
        Ok(self.provider()?.resolve_resource_url(path))
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        let request = HttpRequest::get(self.resolve_url(path)?).header("Accept", "application/json")?;
        self.send(request).await
    }

    /// POST with a form-encoded body
    pub async fn post(&self, path: &str, form: Vec<(String, String)>) -> Result<HttpResponse> {
        let request = HttpRequest::post(self.resolve_url(path)?)
            .header("Accept", "application/json")?
            .form(form);
        self.send(request).await
    }

    /// POST with a JSON body
    pub async fn raw_post(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse> {
        let request = HttpRequest::post(self.resolve_url(path)?)
            .header("Accept", "application/json")?
            .header("Content-Type", "application/json")?
            .json(body);
        self.send(request).await
    }

    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse> {
        let request = HttpRequest::put(self.resolve_url(path)?)
            .header("Accept", "application/json")?
            .header("Content-Type", "application/json")?
            .json(body);
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
        let request =
            HttpRequest::delete(self.resolve_url(path)?).header("Accept", "application/json")?;
        self.send(request).await
    }

    /// Authenticate and send an arbitrary request. Non-2xx responses other
    /// than 401 are returned as-is.
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let subject = self.subject()?;
        let provider = self.provider()?;

        let token = self.tokens.get_access_token(provider, subject).await?;

        request.set_header(AUTHENTICATION_HEADER, &bearer(&token))?;
        request.set_header(API_KEY_HEADER, provider.api_key())?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Sending authenticated request"
        );

        let response = self.transport.send(request).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            // Not expired locally, so the server revoked it
            self.tokens.invalidate(subject, &token)?;
            return Err(KronosError::TokenRevoked);
        }

        Ok(response)
    }

    /// Forget the subject's cached tokens
    pub fn logout(&self) -> Result<usize> {
        let subject = self.subject()?;
        let removed = self.tokens.revoke_all(subject)?;
        tracing::info!(subject = %subject, removed, "Cleared cached tokens");
        Ok(removed)
    }
}
