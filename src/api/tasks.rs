use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::domain::{IntervalSubscription, SubscriptionTask, TaskScope};
use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<SubscriptionTask>> {
    let tasks = state
        .registry
        .visible(state.show_debugging_subscriptions)
        .await;
    Json(tasks)
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTasksRequest {
    tasks: Vec<SubscriptionTask>,
}

pub async fn enable_tasks(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleTasksRequest>,
) -> Result<(), AppError> {
    if body.tasks.is_empty() {
        return Err(AppError::BadRequest("tasks should not be empty".into()));
    }
    if body
        .tasks
        .iter()
        .any(|t| t.action.scope() == TaskScope::Interval)
    {
        return Err(AppError::BadRequest(
            "interval actions go through /intervals".into(),
        ));
    }

    let count = body.tasks.len();
    state.orchestrator.enable_tasks(body.tasks).await;
    tracing::info!(count, "tasks enabled");
    Ok(())
}

pub async fn disable_tasks(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleTasksRequest>,
) -> Result<(), AppError> {
    if body.tasks.is_empty() {
        return Err(AppError::BadRequest("tasks should not be empty".into()));
    }
    for task in body.tasks {
        state.orchestrator.disable_task(task).await;
    }
    Ok(())
}

pub async fn remove_tasks(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleTasksRequest>,
) -> Result<(), AppError> {
    if body.tasks.is_empty() {
        return Err(AppError::BadRequest("tasks should not be empty".into()));
    }
    for task in body.tasks {
        state.orchestrator.remove_task(task).await;
    }
    Ok(())
}

pub async fn list_intervals(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<IntervalSubscription>> {
    Json(state.registry.intervals().await)
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToggleIntervalRequest {
    sub: IntervalSubscription,
}

pub async fn enable_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleIntervalRequest>,
) -> Result<(), AppError> {
    if body.sub.action.scope() != TaskScope::Interval {
        return Err(AppError::BadRequest(format!(
            "{} is not an interval action",
            body.sub.action
        )));
    }
    state.orchestrator.enable_interval(body.sub).await;
    Ok(())
}

pub async fn disable_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleIntervalRequest>,
) -> Result<(), AppError> {
    state.orchestrator.disable_interval(body.sub).await;
    Ok(())
}

pub async fn remove_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleIntervalRequest>,
) -> Result<(), AppError> {
    state.orchestrator.remove_interval(body.sub).await;
    Ok(())
}
