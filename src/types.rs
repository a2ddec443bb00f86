use serde::{Deserialize, Serialize};

/// Access credential returned by the Coinbase OAuth token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(skip_deserializing, default = "now")]
    pub obtained_at: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

fn now() -> u64 {
    crate::utils::unix_timestamp()
}

/// The ways a request to the Coinbase API can be authenticated.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Bearer token obtained through the OAuth authorization-code flow.
    OAuth(Token),
    /// Static API key and secret, used to sign each request.
    ApiKey { key: String, secret: String },
}

/// Query parameters Coinbase appends to the OAuth redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
