//! REST endpoint handlers organized by resource.

pub mod channels;
pub mod events;
pub mod message;
pub mod system;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;

use crate::app_state::AppState;
use crate::error::RelayError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(events::routes())
        .merge(channels::routes())
}

/// Maps a JSON decode failure onto the relay's error format.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| RelayError::InvalidRequest(rejection.body_text()))
}
