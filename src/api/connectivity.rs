use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::domain::ConnectivityState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ConnectivityResponse {
    pub state: ConnectivityState,
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ConnectivityResponse> {
    Json(ConnectivityResponse {
        state: state.connectivity.state().await,
    })
}

pub async fn connect(State(state): State<Arc<AppState>>) -> Result<(), AppError> {
    state.connectivity.connect().await?;
    Ok(())
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> Result<(), AppError> {
    state.connectivity.disconnect().await?;
    Ok(())
}

pub async fn abort(State(state): State<Arc<AppState>>) -> Result<(), AppError> {
    state.connectivity.abort_connecting().await;
    Ok(())
}
