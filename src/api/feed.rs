use crate::app_state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;

/// SSE stream of app notifications: task toggles, connectivity transitions,
/// event verdicts.
pub async fn notifications(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sink.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(notification) => match Event::default()
                .event("notification")
                .json_data(&notification)
            {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize notification");
                    None
                }
            },
            Err(err) => {
                // Slow consumer dropped some messages; it catches up from here.
                tracing::warn!(error = %err, "notification feed lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
