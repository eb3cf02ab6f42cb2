use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::path::PathBuf;

use crate::auth::{Provider, ProviderConfig, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH};

/// Kronos client - authenticated access to the Kronos REST API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URI of the Kronos tenant
    #[arg(short = 'b', long, env = "KRONOS_BASE_URI", default_value = "https://secure.saashr.com")]
    pub base_uri: String,

    /// Kronos username (also the token cache key)
    #[arg(short = 'u', long, env = "KRONOS_USERNAME")]
    pub username: Option<String>,

    /// Kronos password (prompted for when missing)
    #[arg(long, env = "KRONOS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// API key issued for the company
    #[arg(short = 'k', long, env = "KRONOS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Company id, substituted for {cid}
    #[arg(long, env = "KRONOS_COMPANY_ID")]
    pub company_id: Option<String>,

    /// Company short name, substituted for {cname}
    #[arg(short = 'c', long, env = "KRONOS_COMPANY_SHORT_NAME")]
    pub company: Option<String>,

    /// Login path, relative to the base URI
    #[arg(long, env = "KRONOS_LOGIN_PATH", default_value = DEFAULT_LOGIN_PATH)]
    pub login_path: String,

    /// Token refresh path, relative to the base URI
    #[arg(long, env = "KRONOS_REFRESH_PATH", default_value = DEFAULT_REFRESH_PATH)]
    pub refresh_path: String,

    /// Path to the SQLite token cache
    #[arg(short = 'd', long, env = "KRONOS_TOKEN_DB")]
    pub token_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// GET an arbitrary path ({cid} and {cname} are substituted)
    Get { path: String },
    /// Show the authenticated user's employee record
    Me,
    /// List employees, or show one
    Employees {
        #[arg(long)]
        id: Option<String>,
    },
    /// List cost centers, or show one
    CostCenters {
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete the cached token for the user
    Logout,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Kronos tenant
    pub base_uri: String,
    pub username: String,
    pub password: Option<String>,
    pub api_key: String,
    pub company_id: String,
    pub company_short_name: String,
    pub login_path: String,
    pub refresh_path: String,

    // Token cache
    pub token_db_file: PathBuf,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,

    pub command: Command,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > .env > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            base_uri: args.base_uri,

            username: args
                .username
                .context("KRONOS_USERNAME is required (use -u or set KRONOS_USERNAME env var)")?,

            password: args.password.filter(|p| !p.is_empty()),

            api_key: args
                .api_key
                .context("KRONOS_API_KEY is required (use -k or set KRONOS_API_KEY env var)")?,

            company_id: args
                .company_id
                .context("KRONOS_COMPANY_ID is required (use --company-id or set KRONOS_COMPANY_ID env var)")?,

            company_short_name: args
                .company
                .context("KRONOS_COMPANY_SHORT_NAME is required (use -c or set KRONOS_COMPANY_SHORT_NAME env var)")?,

            login_path: args.login_path,
            refresh_path: args.refresh_path,

            token_db_file: args
                .token_db
                .map(|s| expand_tilde(&s))
                .unwrap_or_else(default_token_db_path),

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),

            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,

            log_level: args.log_level,

            command: args.command,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_uri)
            .with_context(|| format!("KRONOS_BASE_URI is not a valid URI: {}", self.base_uri))?;

        if self.username.is_empty() {
            anyhow::bail!("KRONOS_USERNAME cannot be empty");
        }

        if self.company_id.is_empty() {
            anyhow::bail!("KRONOS_COMPANY_ID cannot be empty");
        }

        Ok(())
    }

    /// Build the endpoint descriptor, prompting for the password if it was
    /// not configured
    pub fn provider(&self) -> Result<Provider> {
        let password = match self.password {
            Some(ref password) => password.clone(),
            None => prompt_password(&self.username)?,
        };

        Provider::new(ProviderConfig {
            base_uri: self.base_uri.clone(),
            username: self.username.clone(),
            password,
            api_key: self.api_key.clone(),
            company_id: self.company_id.clone(),
            company_short_name: self.company_short_name.clone(),
            login_path: self.login_path.clone(),
            refresh_path: self.refresh_path.clone(),
        })
        .context("Invalid Kronos provider configuration")
    }
}

fn prompt_password(username: &str) -> Result<String> {
    let password: String = Password::new()
        .with_prompt(format!("Kronos password for {}", username))
        .interact()
        .context("Failed to read KRONOS_PASSWORD")?;

    if password.is_empty() {
        anyhow::bail!("KRONOS_PASSWORD cannot be empty");
    }

    Ok(password)
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// `<data dir>/kronos-client/tokens.sqlite3`, falling back to the working directory
fn default_token_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("kronos-client"))
        .unwrap_or_default()
        .join("tokens.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec![
            "kronos",
            "--username",
            "jdoe",
            "--password",
            "s3cret",
            "--api-key",
            "key",
            "--company",
            "ACME",
            "--company-id",
            "33560858",
        ];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_default_token_db_path() {
        assert!(default_token_db_path().ends_with("tokens.sqlite3"));
    }

    #[test]
    fn test_config_from_args() {
        let config = Config::from_args(args(&["--token-db", "/tmp/t.db", "me"])).unwrap();

        assert_eq!(config.username, "jdoe");
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.company_short_name, "ACME");
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.token_db_file, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.command, Command::Me);
        config.validate().unwrap();
    }

    #[test]
    fn test_subcommands() {
        let config = Config::from_args(args(&["get", "/ta/rest/v2/companies/{cid}"])).unwrap();
        assert_eq!(
            config.command,
            Command::Get {
                path: "/ta/rest/v2/companies/{cid}".to_string()
            }
        );

        let config = Config::from_args(args(&["cost-centers", "--id", "9"])).unwrap();
        assert_eq!(
            config.command,
            Command::CostCenters {
                id: Some("9".to_string())
            }
        );
    }

    #[test]
    fn test_provider_from_config() {
        let config = Config::from_args(args(&["logout"])).unwrap();
        let provider = config.provider().unwrap();

        assert_eq!(provider.password(), "s3cret");
        assert_eq!(
            provider.login_endpoint(),
            "https://secure.saashr.com/ta/rest/v1/login"
        );
        assert_eq!(
            provider.resolve_resource_url("/c/{cid}"),
            "https://secure.saashr.com/c/33560858"
        );
    }

    #[test]
    fn test_company_id_is_required() {
        std::env::remove_var("KRONOS_COMPANY_ID");
        let argv = vec![
            "kronos", "--username", "jdoe", "--api-key", "key", "--company", "ACME", "me",
        ];
        let err = Config::from_args(CliArgs::try_parse_from(argv).unwrap()).unwrap_err();
        assert!(err.to_string().contains("KRONOS_COMPANY_ID"));

        let mut config = Config::from_args(args(&["me"])).unwrap();
        config.company_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_uri_fails_validation() {
        let config = Config::from_args(args(&["--base-uri", "nope", "me"])).unwrap();
        assert!(config.validate().is_err());
    }
}
