use axum::{Extension, extract::Query, response::Response};

use super::{ApiError, AppState, accounts::relay};
use crate::{
    coinbase::auth::{self, OAuthApp},
    types::{CallbackParams, Credentials},
};

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    // State is checked before anything else, including provider errors.
    let Some(anti_forgery) = params.state.as_deref() else {
        return Err(ApiError::InvalidState);
    };
    if !state.states.verify(anti_forgery).await {
        return Err(ApiError::InvalidState);
    }

    if let Some(error) = params.error {
        return Err(ApiError::AuthorizationDenied(
            params.error_description.unwrap_or(error),
        ));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingCode)?;

    let app = OAuthApp {
        client_id: state
            .config
            .client_id
            .as_deref()
            .ok_or(ApiError::NotConfigured("COINBASE_CLIENT_ID"))?,
        client_secret: state
            .config
            .client_secret
            .as_deref()
            .ok_or(ApiError::NotConfigured("COINBASE_CLIENT_SECRET"))?,
    };

    let token = auth::exchange_code(&state.coinbase, &state.config, app, &code).await?;
    let accounts = state
        .coinbase
        .fetch_accounts(&Credentials::OAuth(token))
        .await?;

    Ok(relay(accounts))
}
