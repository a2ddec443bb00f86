use axum::body::Bytes;
use reqwest::{
    RequestBuilder,
    header::{AUTHORIZATION, HeaderValue},
};

use super::{CoinbaseClient, CoinbaseError, signature};
use crate::{types::Credentials, utils};

pub const ACCOUNTS_PATH: &str = "/v2/accounts";

impl CoinbaseClient {
    /// Fetches the account list of whoever `credentials` authenticate.
    ///
    /// The body is returned exactly as Coinbase sent it so that the relay
    /// never reorders or drops fields.
    pub async fn fetch_accounts(&self, credentials: &Credentials) -> Result<Bytes, CoinbaseError> {
        let request = self.http.get(self.url(ACCOUNTS_PATH));
        let request = self.authenticate(request, credentials, "GET", ACCOUNTS_PATH, "")?;

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CoinbaseError::Api { status, body });
        }

        Ok(res.bytes().await?)
    }

    fn authenticate(
        &self,
        request: RequestBuilder,
        credentials: &Credentials,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<RequestBuilder, CoinbaseError> {
        let request = request.header("CB-VERSION", &self.api_version);

        match credentials {
            Credentials::OAuth(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
                    .map_err(|e| CoinbaseError::Signing(e.to_string()))?;
                value.set_sensitive(true);
                Ok(request.header(AUTHORIZATION, value))
            }
            Credentials::ApiKey { key, secret } => {
                let timestamp = utils::unix_timestamp();
                let sign =
                    signature::sign_request(secret, timestamp, method, request_path, body)?;
                Ok(request
                    .header("CB-ACCESS-KEY", key)
                    .header("CB-ACCESS-SIGN", sign)
                    .header("CB-ACCESS-TIMESTAMP", timestamp.to_string()))
            }
        }
    }
}
