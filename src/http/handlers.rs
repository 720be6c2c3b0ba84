//! Endpoint handlers for the hash service.
//!
//! Each handler checks its own method and reads path/query parameters from
//! the `RouteParams` extension the router attaches before dispatch.

use axum::{
    body::Body,
    extract::FromRequest,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Form, Json,
};

use crate::hashing::{Lookup, SubmissionId, SubmissionStore};
use crate::http::response::{ApiError, HashResponse, MessageResponse, SubmitResponse};
use crate::lifecycle::Shutdown;
use crate::routing::RouteParams;

pub const PASSWORD_FIELD: &str = "password";
pub const ID_FIELD: &str = "id";
pub const SHUTDOWN_MESSAGE: &str = "server shutting down";

fn is_form_encoded(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn param(request: &Request<Body>, name: &str) -> Option<String> {
    request
        .extensions()
        .get::<RouteParams>()
        .and_then(|params| params.get(name))
        .map(str::to_owned)
}

/// `POST /hash`: accept a password and return its identifier.
pub async fn submit(
    store: SubmissionStore,
    request: Request<Body>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    if request.method() != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    // Only a url-encoded body is read; any other body is ignored and the
    // query string is used. Body values take precedence over the query.
    let from_query = param(&request, PASSWORD_FIELD);
    let from_body = if is_form_encoded(&request) {
        match Form::<Vec<(String, String)>>::from_request(request, &()).await {
            Ok(Form(pairs)) => pairs
                .into_iter()
                .find_map(|(name, value)| (name == PASSWORD_FIELD).then_some(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "Rejected hash submission body");
                return Err(ApiError::BadRequest("unable to parse form data".into()));
            }
        }
    } else {
        None
    };
    let password = from_body.or(from_query).unwrap_or_default();

    if password.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "must provide '{PASSWORD_FIELD}' field"
        )));
    }

    let id = store.submit(password);
    Ok((StatusCode::CREATED, Json(SubmitResponse { id: id.get() })))
}

/// `GET /hash/{id}`: return the digest once it has been computed.
pub async fn fetch(
    store: SubmissionStore,
    request: Request<Body>,
) -> Result<Json<HashResponse>, ApiError> {
    if request.method() != Method::GET {
        return Err(ApiError::MethodNotAllowed);
    }

    let raw = param(&request, ID_FIELD).unwrap_or_default();
    let id: i64 = raw.parse().map_err(|_| {
        ApiError::BadRequest(format!("provided id '{raw}' is not a valid integer"))
    })?;

    // Pending and never-issued ids share one 404; clients cannot tell them apart.
    let not_found = || ApiError::NotFound(format!("no hash for id '{id}' available"));
    let id = u64::try_from(id)
        .map(SubmissionId::new)
        .map_err(|_| not_found())?;

    match store.fetch(id) {
        Lookup::Ready(hash) => Ok(Json(HashResponse { id: id.get(), hash })),
        Lookup::Pending => {
            tracing::debug!(id = %id, "Digest still being computed");
            Err(not_found())
        }
        Lookup::Unknown => Err(not_found()),
    }
}

/// `GET /shutdown`: acknowledge, then let the control task stop the server.
pub async fn shutdown(
    shutdown: Shutdown,
    request: Request<Body>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.method() != Method::GET {
        return Err(ApiError::MethodNotAllowed);
    }

    tracing::info!("Shutdown requested over HTTP");
    if !shutdown.trigger() {
        tracing::warn!("Shutdown already in progress");
    }

    Ok(Json(MessageResponse {
        message: SHUTDOWN_MESSAGE.to_string(),
    }))
}
