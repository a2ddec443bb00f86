use axum::{
    Extension,
    body::{Body, Bytes},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use super::{ApiError, AppState};
use crate::types::Credentials;

/// Direct account check authenticated with the static API key and secret.
pub async fn accounts(Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let credentials = Credentials::ApiKey {
        key: state
            .config
            .api_key
            .clone()
            .ok_or(ApiError::NotConfigured("COINBASE_KEY"))?,
        secret: state
            .config
            .api_secret
            .clone()
            .ok_or(ApiError::NotConfigured("COINBASE_SECRET"))?,
    };

    let accounts = state.coinbase.fetch_accounts(&credentials).await?;
    Ok(relay(accounts))
}

/// Answers with the upstream body unchanged.
pub(super) fn relay(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(body),
    )
        .into_response()
}
