use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;

use kronos_client::auth::{SqliteTokenStore, SystemClock};
use kronos_client::config::{Command, Config};
use kronos_client::http_client::ReqwestTransport;
use kronos_client::resources::{CostCenters, Employees, Query};
use kronos_client::KronosClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Base URI: {}", config.base_uri);
    tracing::debug!("Token cache: {}", config.token_db_file.display());

    if let Some(parent) = config.token_db_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token cache directory: {}", parent.display())
            })?;
        }
    }
    let store = SqliteTokenStore::open(&config.token_db_file)
        .context("Failed to open token cache")?;

    let transport = ReqwestTransport::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let mut client = KronosClient::new(Arc::new(store), Arc::new(transport), Arc::new(SystemClock))
        .with_subject(config.username.clone());

    // Logging out only touches the cache, so skip the password prompt
    if config.command != Command::Logout {
        client.set_provider(config.provider()?);
    }

    let body = run(&client, &config.command).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn run(client: &KronosClient, command: &Command) -> Result<Value> {
    let body = match command {
        Command::Get { path } => {
            let response = client.get(path).await?;
            if !response.is_success() {
                anyhow::bail!("GET {} failed: {} - {}", path, response.status, response.text());
            }
            response.json::<Value>()?
        }
        Command::Me => Employees::new(client).me().await?,
        Command::Employees { id: Some(id) } => Employees::new(client).get_by_id(id).await?,
        Command::Employees { id: None } => Employees::new(client).get_all().await?,
        Command::CostCenters { id: Some(id) } => CostCenters::new(client).get_by_id(id).await?,
        Command::CostCenters { id: None } => CostCenters::new(client).get_all(Query::new()).await?,
        Command::Logout => json!({
            "subject": client.subject()?,
            "removed": client.logout()?,
        }),
    };

    Ok(body)
}
