// Endpoint descriptor for a Kronos tenant

use reqwest::Url;

use crate::error::{KronosError, Result};

/// Placeholder replaced with the company (tenant) id
pub const COMPANY_ID_PLACEHOLDER: &str = "{cid}";

/// Placeholder replaced with the company short name
pub const COMPANY_NAME_PLACEHOLDER: &str = "{cname}";

pub const DEFAULT_LOGIN_PATH: &str = "/ta/rest/v1/login";
pub const DEFAULT_REFRESH_PATH: &str = "/ta/rest/v1/refresh-token";

/// Raw settings a [`Provider`] is built from
#[derive(Clone)]
pub struct ProviderConfig {
    pub base_uri: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub company_id: String,
    pub company_short_name: String,
    pub login_path: String,
    pub refresh_path: String,
}

/// How to reach the authentication endpoints and build resource URLs.
/// Read-only once constructed.
#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
}

impl Provider {
    /// Validate the base URI and build the descriptor
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let base = Url::parse(&config.base_uri).map_err(|e| {
            KronosError::Configuration(format!("invalid base URI {:?}: {}", config.base_uri, e))
        })?;
        if !base.has_host() {
            return Err(KronosError::Configuration(format!(
                "base URI {:?} has no host",
                config.base_uri
            )));
        }

        Ok(Self { config })
    }

    pub fn base_uri(&self) -> &str {
        &self.config.base_uri
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn password(&self) -> &str {
        &self.config.password
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn company_id(&self) -> &str {
        &self.config.company_id
    }

    pub fn company_short_name(&self) -> &str {
        &self.config.company_short_name
    }

    pub fn login_endpoint(&self) -> String {
        format!("{}{}", self.config.base_uri, self.config.login_path)
    }

    pub fn refresh_endpoint(&self) -> String {
        format!("{}{}", self.config.base_uri, self.config.refresh_path)
    }

    /// Make `path` absolute against the base URI unless it already names a host,
    /// then substitute the company placeholders. Network-path references
    /// (`//host/path`) count as naming a host.
    ///
    /// Substitution is textual: every `{cid}` and `{cname}` in the result is
    /// replaced, including occurrences inside query values.
    pub fn resolve_resource_url(&self, path: &str) -> String {
        let absolute = if has_authority(path) {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_uri, path)
        };

        absolute
            .replace(COMPANY_ID_PLACEHOLDER, &self.config.company_id)
            .replace(COMPANY_NAME_PLACEHOLDER, &self.config.company_short_name)
    }
}

fn has_authority(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }
    matches!(Url::parse(path), Ok(url) if url.has_host())
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("base_uri", &self.config.base_uri)
            .field("username", &self.config.username)
            .field("password", &"[censored]")
            .field("api_key", &"[censored]")
            .field("company_id", &self.config.company_id)
            .field("company_short_name", &self.config.company_short_name)
            .field("login_path", &self.config.login_path)
            .field("refresh_path", &self.config.refresh_path)
            .finish()
    }
}
