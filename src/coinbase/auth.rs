use url::Url;

use super::{CoinbaseClient, CoinbaseError};
use crate::{config::Config, types::Token};

/// OAuth application credentials registered with Coinbase.
#[derive(Debug, Clone, Copy)]
pub struct OAuthApp<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Builds the Coinbase authorization URL the user is redirected to.
///
/// The URL carries the standard authorization-code parameters
/// (`response_type=code`, `client_id`, `redirect_uri`, `scope`, `state`)
/// plus `account=all`, which asks Coinbase to grant access to every wallet of
/// the user instead of only the primary one.
///
/// # Arguments
///
/// * `config` - Provides the authorization endpoint, redirect URL and scopes
/// * `client_id` - OAuth client identifier of the application
/// * `state` - Anti-forgery token that Coinbase echoes back on the callback
///
/// # Errors
///
/// Fails only if the configured authorization endpoint is not a valid URL.
///
/// # Example
///
/// ```
/// let url = authorize_url(&config, "client-id", "hogefoo")?;
/// assert!(url.as_str().contains("account=all"));
/// ```
pub fn authorize_url(
    config: &Config,
    client_id: &str,
    state: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&config.auth_url)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state)
        .append_pair("account", "all");
    Ok(url)
}

/// Exchanges an authorization code for an access token.
///
/// Completes the OAuth2 authorization-code flow by posting the code received
/// on the callback to the token endpoint. The client credentials are sent as
/// form fields together with the redirect URL that was used for the
/// authorization request.
///
/// # Arguments
///
/// * `client` - Shared Coinbase client; its timeout bounds the exchange
/// * `config` - Provides the token endpoint and redirect URL
/// * `app` - OAuth client id and secret
/// * `code` - Authorization code from the callback query string
///
/// # Returns
///
/// Returns the parsed [`Token`] with `obtained_at` set to the current time.
///
/// # Errors
///
/// - [`CoinbaseError::TokenExchange`] if Coinbase answers with a non-success
///   status (expired or reused code, wrong redirect URL, bad credentials)
/// - [`CoinbaseError::InvalidToken`] if the success body is not a token
/// - [`CoinbaseError::Transport`] on network failures and timeouts
///
/// # Security Note
///
/// The authorization code is single-use. The token is never persisted; each
/// callback derives a fresh one.
pub async fn exchange_code(
    client: &CoinbaseClient,
    config: &Config,
    app: OAuthApp<'_>,
    code: &str,
) -> Result<Token, CoinbaseError> {
    let res = client
        .http()
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", app.client_id),
            ("client_secret", app.client_secret),
            ("redirect_uri", &config.redirect_url),
        ])
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(CoinbaseError::TokenExchange { status, body });
    }

    res.json::<Token>().await.map_err(CoinbaseError::InvalidToken)
}
