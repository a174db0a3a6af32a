//! Server-Sent Events stream of pipeline events

use crate::api::AppContext;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// GET /api/events - SSE stream of alert and status events
///
/// Sends the current alert sequence and connectivity status as an initial
/// event, then forwards every broadcast pipeline event.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let mut rx = ctx.state.subscribe_events();
    let alerts = ctx.state.alerts().await;
    let status = ctx.state.status().await;

    let stream = async_stream::stream! {
        let initial = serde_json::json!({ "alerts": alerts, "status": status });
        yield Ok(Event::default().event("InitialState").data(initial.to_string()));

        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        yield Ok(Event::default().event(event.event_type()).data(json));
                    }
                    Err(err) => warn!("Failed to serialize event: {}", err),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE client lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
