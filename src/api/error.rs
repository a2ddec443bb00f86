use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{coinbase::CoinbaseError, warning};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid access: state does not match")]
    InvalidState,

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("missing authorization code")]
    MissingCode,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("cannot build authorization URL: {0}")]
    AuthorizeUrl(#[from] url::ParseError),

    #[error(transparent)]
    Upstream(#[from] CoinbaseError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidState | ApiError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            ApiError::MissingCode => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured(_) | ApiError::AuthorizeUrl(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidState => "invalid_state",
            ApiError::AuthorizationDenied(_) => "access_denied",
            ApiError::MissingCode => "missing_code",
            ApiError::NotConfigured(_) | ApiError::AuthorizeUrl(_) => "configuration_error",
            ApiError::Upstream(CoinbaseError::TokenExchange { .. })
            | ApiError::Upstream(CoinbaseError::InvalidToken(_)) => "token_exchange_failed",
            ApiError::Upstream(_) => "upstream_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(e) = &self {
            warning!("{}", e);
            if let Some(body) = e.upstream_body() {
                warning!("response body: {}", body);
            }
        }

        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
