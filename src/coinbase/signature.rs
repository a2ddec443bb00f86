use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::CoinbaseError;

type HmacSha256 = Hmac<Sha256>;

/// Computes the `CB-ACCESS-SIGN` header value for an API key request.
///
/// The prehash string is `timestamp + method + request_path + body`, where
/// `method` is upper case and `request_path` includes the query string. The
/// result is the lowercase hex encoded HMAC-SHA256 keyed with the API secret.
///
/// # Example
///
/// ```
/// let sign = sign_request("secret", 1700000000, "GET", "/v2/accounts", "")?;
/// assert_eq!(sign.len(), 64);
/// ```
pub fn sign_request(
    secret: &str,
    timestamp: u64,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String, CoinbaseError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoinbaseError::Signing(e.to_string()))?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(method.to_ascii_uppercase().as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
