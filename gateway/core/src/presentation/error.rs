// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP mapping of `GatewayError`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::application::error::GatewayError;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidPath(_)
            | GatewayError::InvalidName(_)
            | GatewayError::InvalidBody(_)
            | GatewayError::EmptyUpload
            | GatewayError::QuotaExceeded { .. }
            | GatewayError::QuotaShrinkBelowUsage { .. }
            | GatewayError::CannotDeleteDirectory(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::NameConflict(_) => StatusCode::CONFLICT,
            GatewayError::Probe(_)
            | GatewayError::Io { .. }
            | GatewayError::Repository(_)
            | GatewayError::LedgerOutOfSync { .. }
            | GatewayError::Certificate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Error of an admin route: identical to `GatewayError`, plus a Basic
/// challenge on 401.
#[derive(Debug)]
pub struct AdminError(pub GatewayError);

impl From<GatewayError> for AdminError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let challenge = matches!(self.0, GatewayError::NotAuthenticated);
        let mut response = self.0.into_response();
        if challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"strongbox\""),
            );
        }
        response
    }
}
