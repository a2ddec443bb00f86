//! # Coinbase Integration Module
//!
//! This module wraps the parts of the Coinbase platform the relay talks to:
//! the OAuth2 authorization server and the v2 REST API. All HTTP traffic goes
//! through one pooled [`reqwest::Client`] built with the configured request
//! timeout, so every outbound call is bounded.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handlers (api)
//!          ↓
//! Coinbase Integration Layer
//!     ├── Authentication (OAuth2 authorization code)
//!     ├── Request Signing (API key + HMAC-SHA256)
//!     └── Accounts (GET /v2/accounts)
//!          ↓
//! HTTP Layer (reqwest)
//!          ↓
//! Coinbase
//! ```
//!
//! ## Core Modules
//!
//! - [`auth`] - Authorization URL construction and code exchange
//! - [`accounts`] - Fetches the account list for any [`Credentials`]
//! - [`signature`] - `CB-ACCESS-SIGN` computation for API key requests
//!
//! ## Error Types
//!
//! Every operation returns [`CoinbaseError`]. Upstream answers with a
//! non-success status keep their status and body so the caller can log them.
//!
//! [`Credentials`]: crate::types::Credentials

pub mod accounts;
pub mod auth;
pub mod signature;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum CoinbaseError {
    #[error("token exchange failed with status {status}")]
    TokenExchange { status: StatusCode, body: String },

    #[error("token endpoint returned an unreadable token: {0}")]
    InvalidToken(#[source] reqwest::Error),

    #[error("Coinbase API request failed with status {status}")]
    Api { status: StatusCode, body: String },

    #[error("request to Coinbase failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cannot sign request: {0}")]
    Signing(String),
}

impl CoinbaseError {
    pub fn is_timeout(&self) -> bool {
        match self {
            CoinbaseError::Transport(e) | CoinbaseError::InvalidToken(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Response body sent by Coinbase, if any.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            CoinbaseError::TokenExchange { body, .. } | CoinbaseError::Api { body, .. } => {
                Some(body.as_str()).filter(|b| !b.trim().is_empty())
            }
            _ => None,
        }
    }
}

/// Thin handle bundling the HTTP client with the endpoints it talks to.
#[derive(Debug, Clone)]
pub struct CoinbaseClient {
    http: Client,
    api_url: String,
    api_version: String,
}

impl CoinbaseClient {
    pub fn new(config: &Config) -> Result<Self, CoinbaseError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(CoinbaseClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}
