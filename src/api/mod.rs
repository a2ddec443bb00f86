//! # API Module
//!
//! This module provides the HTTP endpoints of the relay. Each handler is a
//! short linear sequence: obtain credentials, call Coinbase, relay the answer.
//!
//! ## Endpoints
//!
//! ### Account relay
//!
//! - [`accounts`] - `GET /`. Fetches the account list with the static API key
//!   and secret, signing the request with HMAC-SHA256.
//! - [`callback`] - `GET /callback`. Completes the OAuth2 authorization-code
//!   flow: verifies the anti-forgery state, exchanges the code for a token
//!   and fetches the account list with that token.
//!
//! ### Authentication
//!
//! - [`login`] - `GET /login`. Issues an anti-forgery state and redirects the
//!   caller to the Coinbase authorization page with `301 Moved Permanently`.
//!
//! ### Monitoring
//!
//! - [`health`] - `GET /health`. Returns service name, status and version.
//!
//! ## Error Handling
//!
//! Handlers return [`ApiError`], which renders as a JSON error body with a
//! matching status code. A failing Coinbase call only fails the request that
//! made it; the server keeps serving.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use coinbase_relay::api::{self, AppState};
//!
//! let app = Router::new()
//!     .route("/", get(api::accounts))
//!     .route("/login", get(api::login))
//!     .route("/callback", get(api::callback))
//!     .layer(Extension(AppState::new(config)?));
//! ```

mod accounts;
mod callback;
mod error;
mod health;
mod login;

use std::sync::Arc;

pub use accounts::accounts;
pub use callback::callback;
pub use error::ApiError;
pub use health::health;
pub use login::login;

use crate::{
    coinbase::{CoinbaseClient, CoinbaseError},
    config::Config,
    session::StateStore,
};

/// Shared, cheaply cloneable state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coinbase: CoinbaseClient,
    pub states: StateStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, CoinbaseError> {
        let coinbase = CoinbaseClient::new(&config)?;
        let states = match &config.fixed_state {
            Some(fixed) => StateStore::fixed(fixed.clone()),
            None => StateStore::with_limit(config.state_ttl, config.max_pending_states),
        };

        Ok(AppState {
            config: Arc::new(config),
            coinbase,
            states,
        })
    }
}
