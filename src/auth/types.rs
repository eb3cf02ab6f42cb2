// Authentication wire types

use serde::Serialize;

use super::token::Token;

/// Body of the login request
#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub credentials: LoginCredentials<'a>,
}

#[derive(Serialize)]
pub struct LoginCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub company: &'a str,
}

impl std::fmt::Debug for LoginCredentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[censored]")
            .field("company", &self.company)
            .finish()
    }
}

/// What a refresh exchange came back with
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New token issued
    Refreshed(Token),
    /// The refresh endpoint answered 401: the token is revoked
    Rejected,
}
