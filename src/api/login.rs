use axum::{
    Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use super::{ApiError, AppState};
use crate::coinbase::auth;

pub async fn login(Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let client_id = state
        .config
        .client_id
        .as_deref()
        .ok_or(ApiError::NotConfigured("COINBASE_CLIENT_ID"))?;

    let anti_forgery = state.states.issue().await;
    let url = auth::authorize_url(&state.config, client_id, &anti_forgery)?;

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url.to_string())]).into_response())
}
