//! Server-Sent Events (SSE) broadcaster
//!
//! Each client first receives an `InitialState` snapshot, then every event
//! broadcast through [`SharedState`](crate::state::SharedState).

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use soundpad_common::events::SoundpadEvent;
use soundpad_common::time;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe before taking the snapshot so nothing falls in between
    let rx = ctx.state.subscribe_events();
    let initial = initial_state(&ctx);

    let updates = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse_event(&event),
            Err(e) => {
                // Lagged: the client skipped some events
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = async_stream::stream! {
        if let Some(event) = to_sse_event(&initial) {
            yield Ok(event);
        }

        let mut updates = Box::pin(updates);
        while let Some(event) = updates.next().await {
            yield Ok(event);
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Snapshot of everything the page displays
pub fn initial_state(ctx: &AppContext) -> SoundpadEvent {
    let options = ctx.controller.options();
    SoundpadEvent::InitialState {
        now_playing: ctx.state.now_playing().map(|np| np.text),
        timer: ctx.state.timer_display().map(|t| t.text),
        buttons: ctx.state.buttons(),
        volume: ctx.sink.gain(),
        speed: ctx.controller.speed(),
        loop_enabled: options.enabled,
        interval_seconds: options.interval.as_secs_f64(),
        timestamp: time::now(),
    }
}

fn to_sse_event(event: &SoundpadEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
