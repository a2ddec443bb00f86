//! Configuration management for the Coinbase account relay.
//!
//! This module handles loading configuration values from environment
//! variables and `.env` files. Unlike a per-request lookup, the values are
//! read exactly once at startup into an immutable [`Config`] which is then
//! shared with every request handler.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file given on the command line, in the working directory, or in
//!    the local data directory
//! 3. Application defaults (where applicable)

use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

use crate::utils;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SCOPE: &str = "wallet:accounts:read";
pub const DEFAULT_AUTH_URL: &str = "https://www.coinbase.com/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.coinbase.com/oauth/token";
pub const DEFAULT_API_URL: &str = "https://api.coinbase.com";
pub const DEFAULT_API_VERSION: &str = "2021-06-25";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_TTL_SECS: u64 = 600;
pub const DEFAULT_MAX_PENDING_STATES: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("cannot load env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },
}

/// Immutable, process-wide configuration.
///
/// Credentials are optional so that the service can start with only one of
/// the two authentication paths configured. Handlers that need a missing
/// credential answer with a configuration error instead of calling Coinbase.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub api_version: String,
    pub redirect_url: String,
    /// `true` when `redirect_url` came from `COINBASE_REDIRECT_URL` rather
    /// than being derived from `port`.
    pub redirect_url_explicit: bool,
    pub port: u16,
    pub request_timeout: Duration,
    pub fixed_state: Option<String>,
    pub state_ttl: Duration,
    pub max_pending_states: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_id: None,
            client_secret: None,
            api_key: None,
            api_secret: None,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            redirect_url: default_redirect_url(DEFAULT_PORT),
            redirect_url_explicit: false,
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fixed_state: None,
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            max_pending_states: DEFAULT_MAX_PENDING_STATES,
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Reads every `COINBASE_*` variable plus `SERVER_PORT` and
    /// `REQUEST_TIMEOUT_SECS`. Unset variables fall back to the defaults of
    /// [`Config::default`]; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable cannot be
    /// parsed, or if the timeout, state lifetime or pending state limit is
    /// zero.
    ///
    /// # Example
    ///
    /// ```
    /// let config = Config::from_env()?;
    /// println!("listening on {}", config.listen_addr());
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_var("SERVER_PORT", DEFAULT_PORT)?;
        let timeout = parse_var("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let state_ttl = parse_var("COINBASE_STATE_TTL_SECS", DEFAULT_STATE_TTL_SECS)?;
        let max_pending = parse_var("COINBASE_STATE_MAX_PENDING", DEFAULT_MAX_PENDING_STATES)?;
        let redirect_url = var("COINBASE_REDIRECT_URL");

        if timeout == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: timeout.to_string(),
            });
        }
        if state_ttl == 0 {
            return Err(ConfigError::Invalid {
                name: "COINBASE_STATE_TTL_SECS",
                value: state_ttl.to_string(),
            });
        }
        if max_pending == 0 {
            return Err(ConfigError::Invalid {
                name: "COINBASE_STATE_MAX_PENDING",
                value: max_pending.to_string(),
            });
        }

        Ok(Config {
            client_id: var("COINBASE_CLIENT_ID"),
            client_secret: var("COINBASE_CLIENT_SECRET"),
            api_key: var("COINBASE_KEY"),
            api_secret: var("COINBASE_SECRET"),
            scopes: var("COINBASE_SCOPES")
                .map(|s| utils::parse_scopes(&s))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]),
            auth_url: var("COINBASE_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: var("COINBASE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_url: var("COINBASE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_version: var("COINBASE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            redirect_url_explicit: redirect_url.is_some(),
            redirect_url: redirect_url.unwrap_or_else(|| default_redirect_url(port)),
            port,
            request_timeout: Duration::from_secs(timeout),
            fixed_state: var("COINBASE_OAUTH_STATE"),
            state_ttl: Duration::from_secs(state_ttl),
            max_pending_states: max_pending,
        })
    }

    /// Changes the listening port, moving the redirect URL along with it
    /// unless it was configured explicitly.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        if !self.redirect_url_explicit {
            self.redirect_url = default_redirect_url(port);
        }
    }

    /// Address the HTTP listener binds to: every interface on `port`.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Local URL of the login endpoint, used when opening a browser.
    pub fn login_url(&self) -> String {
        format!("http://localhost:{}/login", self.port)
    }
}

/// Loads environment variables from a `.env` file.
///
/// The file is looked up in this order:
/// 1. `path`, if given (typically from `--env-file`)
/// 2. `.env` in the current working directory
/// 3. `coinbase-relay/.env` in the platform-specific local data directory:
///    - Linux: `~/.local/share/coinbase-relay/.env`
///    - macOS: `~/Library/Application Support/coinbase-relay/.env`
///    - Windows: `%LOCALAPPDATA%/coinbase-relay/.env`
///
/// Variables already present in the process environment are not overridden.
///
/// # Returns
///
/// Returns `Ok(Some(path))` with the file that was loaded, or `Ok(None)` if
/// no file was found in the implicit locations. Running without a `.env` file
/// is valid when the variables are exported directly.
///
/// # Errors
///
/// Returns [`ConfigError::EnvFile`] if an explicitly given file cannot be
/// read, or if a discovered file cannot be parsed.
///
/// # Example
///
/// ```
/// use coinbase_relay::config;
///
/// match config::load_env(None) {
///     Ok(Some(path)) => println!("loaded {}", path.display()),
///     Ok(None) => println!("using process environment"),
///     Err(e) => eprintln!("Configuration error: {}", e),
/// }
/// ```
pub fn load_env(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return dotenv::from_path(path)
            .map(|_| Some(path.to_path_buf()))
            .map_err(|e| ConfigError::EnvFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
    }

    let Some(found) = [PathBuf::from(".env"), data_env_path()]
        .into_iter()
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };

    dotenv::from_path(&found).map_err(|e| ConfigError::EnvFile {
        path: found.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(found))
}

fn data_env_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("coinbase-relay/.env");
    path
}

fn default_redirect_url(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
