use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

use crate::{
    api::{handlers::admin::parse_collection, state::AppState},
    domain::ContentRecord,
    error::Result,
    service::{clock::ClockReading, display::BoardView},
};

#[derive(Debug, Serialize)]
pub struct DisplayResponse {
    pub board: BoardView,
    pub clock: ClockReading,
    pub weather: String,
}

pub async fn board(State(state): State<AppState>) -> Json<DisplayResponse> {
    let board = state.board.borrow().clone();
    let weather = state.weather.borrow().clone();

    Json(DisplayResponse {
        board,
        clock: ClockReading::at(Utc::now(), state.settings.display.offset()),
        weather,
    })
}

/// Pushes the board on connect and after every change, until shutdown.
pub async fn stream_board(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut rx = state.board.clone();
    rx.mark_changed();

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let view = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("board")
            .json_data(&view)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok::<_, Infallible>(event), rx))
    });

    Sse::new(stream.take_until(state.shutdown_signal())).keep_alive(KeepAlive::default())
}

/// Currently active documents for embedding elsewhere, in board order.
pub async fn public_list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<ContentRecord>>> {
    let collection = parse_collection(&collection)?;
    let now = Utc::now();

    let records = state.service_context.content_store
        .list_started(collection, now, collection.display_order())
        .await?
        .into_iter()
        .filter(|record| record.is_active(now))
        .collect();

    Ok(Json(records))
}
