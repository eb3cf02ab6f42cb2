// Kronos client - Library root

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod resources;

pub use client::KronosClient;
pub use error::{KronosError, Result, TransportError};
