// Authentication module
// Manages token lifecycle, storage and acquisition

mod clock;
mod manager;
mod provider;
mod refresh;
mod sqlite;
mod store;
mod token;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use manager::TokenManager;
pub use provider::{
    Provider, ProviderConfig, COMPANY_ID_PLACEHOLDER, COMPANY_NAME_PLACEHOLDER,
    DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH,
};
pub use refresh::{bearer, API_KEY_HEADER, AUTHENTICATION_HEADER};
pub use sqlite::SqliteTokenStore;
pub use store::{MemoryTokenStore, TokenStore};
pub use token::{Token, ISSUED_AT_FORMAT};

#[cfg(test)]
pub(crate) use provider::tests::test_provider;
