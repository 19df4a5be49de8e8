use crate::api::accounts::{remove_account, rename_account};
use crate::api::connectivity::{abort, connect, disconnect, get_state};
use crate::api::events::{dismiss_event, list_events};
use crate::api::feed::notifications;
use crate::api::tasks::{
    disable_interval, disable_tasks, enable_interval, enable_tasks, list_intervals, list_tasks,
    remove_interval, remove_tasks,
};
use crate::app_state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub fn create_router(app_state: Arc<AppState>, allowed_origins: Vec<String>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            // if there no allowed origins in env, allow all origins
            if allowed_origins.is_empty() {
                return true;
            }

            let origin = origin.to_str().unwrap_or("");

            allowed_origins.iter().any(|allowed| {
                if allowed.contains('*') {
                    let pattern = allowed.replace("*", "");
                    origin.contains(&pattern)
                } else {
                    origin == allowed
                }
            })
        }))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sse/notifications", get(notifications))
        .route("/tasks", get(list_tasks))
        .route("/tasks/enable", post(enable_tasks))
        .route("/tasks/disable", post(disable_tasks))
        .route("/tasks/remove", post(remove_tasks))
        .route("/intervals", get(list_intervals))
        .route("/intervals/enable", post(enable_interval))
        .route("/intervals/disable", post(disable_interval))
        .route("/intervals/remove", post(remove_interval))
        .route("/accounts/{chain_id}/{address}/rename", post(rename_account))
        .route("/accounts/{chain_id}/{address}", delete(remove_account))
        .route("/events", get(list_events))
        .route("/events/{uid}", delete(dismiss_event))
        .route("/connectivity", get(get_state))
        .route("/connectivity/connect", post(connect))
        .route("/connectivity/disconnect", post(disconnect))
        .route("/connectivity/abort", post(abort))
        .layer(cors)
        .with_state(app_state)
}
