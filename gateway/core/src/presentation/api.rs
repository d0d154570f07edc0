// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! Two routers share one `AppState`:
//!
//! - [`app`] serves every route (over HTTPS when TLS is enabled);
//! - [`bootstrap_app`] serves only `/download_cert` and `/health`, for the
//!   plaintext listener a client uses to fetch the certificate it will pin.
//!
//! Admin routes take an [`AdminPrincipal`], client routes a
//! [`ClientPrincipal`]. Both are request-parts extractors listed first in
//! every handler, so the credential is checked before the path or the body
//! is looked at.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::application::auth::AuthenticationGate;
use crate::application::client_service::ClientService;
use crate::application::error::GatewayError;
use crate::application::file_gateway::FileGateway;
use crate::domain::client::{Client, ClientId};
use crate::infrastructure::certs;
use crate::presentation::error::AdminError;

/// Largest request body accepted by `/upload`
pub const MAX_UPLOAD_BYTES: usize = 128 * 1024 * 1024;

/// Header carrying the target path of `/upload` and `/delete`
pub const PATH_HEADER: &str = "Path";

/// Multipart field holding the uploaded content
pub const UPLOAD_FIELD: &str = "uploadfile";

pub struct AppState {
    pub auth: Arc<AuthenticationGate>,
    pub clients: Arc<dyn ClientService>,
    pub files: Arc<dyn FileGateway>,
    /// Certificate directory; `None` when TLS is disabled
    pub certs_dir: Option<PathBuf>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthenticationGate>,
        clients: Arc<dyn ClientService>,
        files: Arc<dyn FileGateway>,
        certs_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            auth,
            clients,
            files,
            certs_dir,
            start_time: Instant::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Full API router
pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(login_handler))
        .route("/clients", post(create_client_handler).get(list_clients_handler))
        .route(
            "/clients/{id}",
            get(get_client_handler)
                .put(update_client_handler)
                .delete(delete_client_handler),
        )
        .route("/storage_size", get(storage_size_handler))
        .route("/used_space", get(used_space_handler))
        .route("/total_quota", get(total_quota_handler))
        .route("/getClientByAuthCode", get(client_info_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/download/{*path}", get(download_handler))
        .route("/stat/{*path}", get(stat_handler))
        .route("/mkdir/{*path}", get(mkdir_handler))
        .route("/delete", delete(delete_by_header_handler))
        .route("/delete/{*path}", delete(delete_by_path_handler))
        .route("/download_cert", get(download_cert_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Plaintext certificate bootstrap router
pub fn bootstrap_app(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/download_cert", get(download_cert_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Authentication extractors
// ============================================================================

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Proof that the request carried the admin Basic credential
pub struct AdminPrincipal;

impl FromRequestParts<SharedState> for AdminPrincipal {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate_admin_header(authorization(parts))
            .await?;
        Ok(AdminPrincipal)
    }
}

/// The client a Bearer credential belongs to
pub struct ClientPrincipal(pub Client);

impl FromRequestParts<SharedState> for ClientPrincipal {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let client = state
            .auth
            .authenticate_client_header(authorization(parts))
            .await?;
        Ok(ClientPrincipal(client))
    }
}

// ============================================================================
// Unauthenticated
// ============================================================================

async fn health_handler(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "tls": state.certs_dir.is_some(),
    }))
}

// ============================================================================
// Admin routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClientForm {
    pub name: String,
    pub quota: u64,
}

fn parse_form(form: Result<Form<ClientForm>, FormRejection>) -> Result<ClientForm, GatewayError> {
    form.map(|Form(f)| f)
        .map_err(|e| GatewayError::InvalidBody(e.body_text()))
}

fn parse_id(id: Result<Path<ClientId>, PathRejection>) -> Result<ClientId, GatewayError> {
    id.map(|Path(id)| id)
        .map_err(|e| GatewayError::InvalidBody(format!("invalid client id: {}", e.body_text())))
}

async fn login_handler(_admin: AdminPrincipal) -> Json<serde_json::Value> {
    Json(json!({ "status": "authenticated" }))
}

async fn create_client_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
    form: Result<Form<ClientForm>, FormRejection>,
) -> Result<Response, AdminError> {
    let form = parse_form(form)?;
    let client = state.clients.create_client(form.name, form.quota).await?;

    let location = match HeaderValue::from_str(&format!("/clients/{}", client.id)) {
        Ok(location) => location,
        Err(e) => {
            tracing::error!(client_id = %client.id, error = %e, "Cannot form Location header; rolling back");
            state.clients.delete_client(client.id).await?;
            return Err(GatewayError::InvalidBody(format!("unrepresentable location: {}", e)).into());
        }
    };

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(client)).into_response())
}

async fn list_clients_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Client>>, AdminError> {
    Ok(Json(state.clients.list_clients().await?))
}

async fn get_client_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> Result<Json<Client>, AdminError> {
    let id = parse_id(id)?;
    Ok(Json(state.clients.get_client(id).await?))
}

async fn update_client_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
    id: Result<Path<ClientId>, PathRejection>,
    form: Result<Form<ClientForm>, FormRejection>,
) -> Result<Json<Client>, AdminError> {
    let id = parse_id(id)?;
    let form = parse_form(form)?;
    Ok(Json(
        state.clients.update_client(id, form.name, form.quota).await?,
    ))
}

async fn delete_client_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> Result<StatusCode, AdminError> {
    let id = parse_id(id)?;
    state.clients.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn storage_size_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let bytes = state.clients.storage_size().await?;
    Ok(Json(json!({ "storage_size": bytes })))
}

async fn used_space_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let bytes = state.clients.used_space().await?;
    Ok(Json(json!({ "used_space": bytes })))
}

async fn total_quota_handler(
    _admin: AdminPrincipal,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let bytes = state.clients.total_quota().await?;
    Ok(Json(json!({ "total_quota": bytes })))
}

// ============================================================================
// Client routes
// ============================================================================

fn path_header(headers: &HeaderMap) -> Result<String, GatewayError> {
    headers
        .get(PATH_HEADER)
        .ok_or_else(|| GatewayError::InvalidBody(format!("missing {} header", PATH_HEADER)))?
        .to_str()
        .map(str::to_string)
        .map_err(|_| GatewayError::InvalidBody(format!("{} header is not valid text", PATH_HEADER)))
}

async fn client_info_handler(ClientPrincipal(client): ClientPrincipal) -> Json<Client> {
    Json(client)
}

async fn upload_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GatewayError> {
    let path = path_header(&headers)?;
    let mut multipart = multipart.map_err(|e| GatewayError::InvalidBody(e.body_text()))?;

    let mut content: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidBody(e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            content = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::InvalidBody(e.body_text()))?,
            );
            break;
        }
    }
    let content = content
        .ok_or_else(|| GatewayError::InvalidBody(format!("missing '{}' field", UPLOAD_FIELD)))?;

    let receipt = state.files.upload(&client, &path, content).await?;
    Ok(Json(receipt).into_response())
}

async fn download_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let content = state.files.download(&client, &path).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        content,
    )
        .into_response())
}

async fn stat_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let stat = state.files.stat(&client, &path).await?;
    Ok(Json(stat).into_response())
}

async fn mkdir_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let created = state.files.mkdir(&client, &path).await?;
    Ok((StatusCode::CREATED, Json(json!({ "path": created }))).into_response())
}

async fn delete_by_header_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let path = path_header(&headers)?;
    let receipt = state.files.delete_file(&client, &path).await?;
    Ok(Json(receipt).into_response())
}

async fn delete_by_path_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let receipt = state.files.delete_file(&client, &path).await?;
    Ok(Json(receipt).into_response())
}

async fn download_cert_handler(
    ClientPrincipal(client): ClientPrincipal,
    State(state): State<SharedState>,
) -> Result<Response, GatewayError> {
    let dir = state
        .certs_dir
        .as_ref()
        .ok_or_else(|| GatewayError::NotFound("TLS is disabled on this gateway".to_string()))?;

    let pem = certs::read_server_certificate_pem(dir)?;
    tracing::info!(client_id = %client.id, "Served server certificate for pinning");
    Ok(([(header::CONTENT_TYPE, "application/x-pem-file")], pem).into_response())
}
