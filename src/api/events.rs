use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::domain::EventCallback;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<EventCallback>> {
    Json(state.event_log.all().await)
}

pub async fn dismiss_event(
    Path(uid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<(), AppError> {
    if state.event_log.dismiss(&uid).await {
        Ok(())
    } else {
        Err(AppError::NoEvent(uid))
    }
}
