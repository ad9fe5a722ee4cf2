pub mod api;
pub mod config;
pub mod errors;
pub mod jsonapi;
pub mod planning;
pub mod recipes;
pub mod session;
pub mod shopping;

pub use api::{ApiClient, AuthToken};
pub use errors::{PopoteError, PopoteResult};
pub use session::{AuthState, SessionStore};

use crate::session::SessionFile;

/// Initialize logging and environment. Call once from the UI shell before
/// anything else.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();
}

/// The client pieces a UI shell works with: the HTTP client and the session
/// store, sharing one token cell.
pub struct App {
    pub api: ApiClient,
    pub session: SessionStore,
}

/// Build the client from configuration and rehydrate any persisted session.
pub fn bootstrap() -> PopoteResult<App> {
    let config = config::load_config()?;
    let token = AuthToken::new();
    let api = ApiClient::new(&config, token.clone())?;

    let file = SessionFile::default_path(config.storage_dir.as_deref())?;
    let mut session = SessionStore::new(token, file);
    session.hydrate();

    tracing::info!(base_url = %api.base_url(), state = ?session.state(), "client ready");
    Ok(App { api, session })
}
