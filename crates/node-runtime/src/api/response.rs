//! Response envelope and error mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use qc_18_address_callbacks::CallbackError;

/// `{"status":"success","data":...}`
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "data": data }))
}

/// Error rendered as `{"status":"fail","code":...,"msg":...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, msg: impl ToString) -> Self {
        Self {
            status,
            code,
            msg: msg.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<CallbackError> for ApiError {
    fn from(err: CallbackError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            warn!(error = %err, "[qc-18] Registry operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.kind(), &err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "fail",
            "code": self.code,
            "msg": self.msg,
        });
        (self.status, Json(body)).into_response()
    }
}
