//! Inbound event endpoints.
//!
//! Each handler is a thin adapter: parse the body, call one router
//! operation, and let `AppError` choose the status code.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{AppError, Result};
use crate::metrics::InboundMetrics;
use crate::router::{ConnectionEvent, RelayRequest, RelayResponse, RouterError};
use crate::server::AppState;

/// Unparseable bodies are malformed requests, not axum's default 422
fn parse_body<T>(kind: &str, body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        InboundMetrics::record(kind, false);
        AppError::MalformedRequest(rejection.body_text())
    })
}

fn observe<T>(kind: &str, result: std::result::Result<T, RouterError>) -> Result<T> {
    InboundMetrics::record(kind, result.is_ok());
    result.map_err(AppError::from)
}

/// POST /api/v1/events/connect
pub async fn connect(
    State(state): State<AppState>,
    body: std::result::Result<Json<ConnectionEvent>, JsonRejection>,
) -> Result<Json<RelayResponse>> {
    let event = parse_body("connect", body)?;
    observe("connect", state.router.on_connect(&event).await)?;
    Ok(Json(RelayResponse::ok()))
}

/// POST /api/v1/events/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
    body: std::result::Result<Json<ConnectionEvent>, JsonRejection>,
) -> Result<Json<RelayResponse>> {
    let event = parse_body("disconnect", body)?;
    observe("disconnect", state.router.on_disconnect(&event).await)?;
    Ok(Json(RelayResponse::ok()))
}

/// POST /api/v1/relay/reply
pub async fn direct_reply(
    State(state): State<AppState>,
    body: std::result::Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>> {
    let request = parse_body("direct_reply", body)?;
    observe("direct_reply", state.router.direct_reply(&request).await)?;
    Ok(Json(RelayResponse::ok()))
}

/// POST /api/v1/relay/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    body: std::result::Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>> {
    let request = parse_body("broadcast_all", body)?;
    let report = observe("broadcast_all", state.router.broadcast_all(&request).await)?;
    Ok(Json(RelayResponse::with_report(report)))
}
