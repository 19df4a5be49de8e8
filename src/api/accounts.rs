use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::domain::ChainId;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenameAccountRequest {
    name: String,
}

pub async fn rename_account(
    Path((chain_id, address)): Path<(ChainId, String)>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenameAccountRequest>,
) -> Result<(), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name should not be empty".into()));
    }
    state
        .orchestrator
        .rename_account(chain_id, &address, body.name.trim())
        .await;
    Ok(())
}

pub async fn remove_account(
    Path((chain_id, address)): Path<(ChainId, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<(), AppError> {
    state.orchestrator.remove_account(chain_id, &address).await;
    tracing::info!(chain = %chain_id, address = %address, "account removed");
    Ok(())
}
