//! Route handlers.

use crate::error::ApiError;
use crate::request::QueryRequest;
use crate::AppState;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::{info, warn};

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /storm/debug/files`: writes captured by the in-memory file system.
pub async fn debug_files(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(state.file_system.captured())
}

/// `POST /storm/query`
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Malformed query payload");
        ApiError::unprocessable(rejection.body_text())
    })?;
    let query = request.validate().map_err(|e| {
        warn!(error = %e, "Rejected query");
        ApiError::from(e)
    })?;

    info!(topic = %query.topic, stream = query.stream, "Query received");
    if !query.stream {
        let result = state
            .orchestrator
            .run(query.topic.as_str(), query.options)
            .await;
        let response = state.projector.project_blocking(result)?;
        return Ok(Json(response).into_response());
    }

    let events = state
        .orchestrator
        .run_streaming(query.topic.as_str(), query.options);
    let projected = state.projector.project_stream(events).await;
    let status = if projected.failed_before_flush {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let body = Body::from_stream(projected.fragments.map(Ok::<_, Infallible>));
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}
