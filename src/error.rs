use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error taxonomy for the federation core. Every variant carries a
/// fixed HTTP status so route handlers never have to pick one themselves.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("federation error: {0}")]
    Federation(String),

    #[error("invalid uri: {uri}")]
    InvalidUri { uri: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) | Error::InvalidUri { .. } => StatusCode::BAD_REQUEST,
            Error::SignatureVerification(_) => StatusCode::FORBIDDEN,
            Error::Delivery(_) => StatusCode::BAD_GATEWAY,
            Error::Federation(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Delivery(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::BadRequest(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_taxonomy() {
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::SignatureVerification("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Error::Delivery("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Error::Federation("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
