// Token acquisition: credential login and token refresh

use serde_json::Value;

use super::clock::Clock;
use super::provider::Provider;
use super::token::Token;
use super::types::{LoginCredentials, LoginRequest, RefreshOutcome};
use crate::error::{KronosError, Result};
use crate::http_client::{HttpRequest, HttpResponse, Transport};

/// Header carrying the tenant API key
pub const API_KEY_HEADER: &str = "Api-Key";

/// Header carrying the bearer credential. Kronos reads `Authentication`, not
/// `Authorization`.
pub const AUTHENTICATION_HEADER: &str = "Authentication";

/// `Bearer <token>`
pub fn bearer(token: &Token) -> String {
    format!("Bearer {}", token.value())
}

/// Exchange username/password/company for a fresh token
pub async fn login(transport: &dyn Transport, provider: &Provider, clock: &dyn Clock) -> Result<Token> {
    tracing::info!(username = %provider.username(), "Logging in to Kronos...");

    let body = LoginRequest {
        credentials: LoginCredentials {
            username: provider.username(),
            password: provider.password(),
            company: provider.company_short_name(),
        },
    };
    let body = serde_json::to_value(&body)
        .map_err(|e| KronosError::Serialization(format!("unable to encode login request: {}", e)))?;

    let request = HttpRequest::post(provider.login_endpoint())
        .header(API_KEY_HEADER, provider.api_key())?
        .header("Accept", "application/json")?
        .header("Content-Type", "application/json")?
        .json(body);

    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(server_error("Login", &response));
    }

    let payload: Value = response.json()?;
    let token = Token::from_login_response(provider, clock.now(), &payload)?;

    tracing::info!(
        username = %provider.username(),
        expires_at = ?token.expires_at(),
        "Logged in to Kronos"
    );

    Ok(token)
}

/// Renew `token` through the refresh endpoint.
///
/// A 401 is reported as [`RefreshOutcome::Rejected`]; any other non-success
/// status is a server error.
pub async fn refresh(
    transport: &dyn Transport,
    provider: &Provider,
    clock: &dyn Clock,
    token: &Token,
) -> Result<RefreshOutcome> {
    tracing::info!(
        username = %provider.username(),
        issued_at = %token.issued_at(),
        "Refreshing Kronos token..."
    );

    let request = HttpRequest::get(provider.refresh_endpoint())
        .header(API_KEY_HEADER, provider.api_key())?
        .header("Accept", "application/json")?
        .header(AUTHENTICATION_HEADER, &bearer(token))?;

    let response = transport.send(request).await?;
    if response.status.as_u16() == 401 {
        tracing::warn!(
            username = %provider.username(),
            "Refresh rejected with 401, treating token as revoked"
        );
        return Ok(RefreshOutcome::Rejected);
    }
    if !response.is_success() {
        return Err(server_error("Token refresh", &response));
    }

    let payload: Value = response.json()?;
    let refreshed = Token::from_refresh_response(provider, clock.now(), &payload, token)?;

    tracing::info!(
        username = %provider.username(),
        expires_at = ?refreshed.expires_at(),
        "Token refreshed"
    );

    Ok(RefreshOutcome::Refreshed(refreshed))
}

fn server_error(step: &str, response: &HttpResponse) -> KronosError {
    let err = KronosError::from_server_response(response.status.as_u16(), &response.body);
    tracing::error!(
        status = response.status.as_u16(),
        response_body = %response.text(),
        "{} failed: {}",
        step,
        err
    );
    err
}
