use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use matsal_core::ports::{ErrorKind, PortError};
use serde_json::json;
use tracing::{debug, error};

/// A [`PortError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub(crate) struct ApiError(pub(crate) PortError);

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(err = %self.0, "request failed");
        } else {
            debug!(err = %self.0, %status, "request rejected");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
