use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{AdminListItem, Collection, ContentRecord},
    error::{AppError, Result},
    service::editor::{DeleteOutcome, DELETED_MESSAGE},
    store::{ContentQuery, SnapshotSource},
};

pub(crate) fn parse_collection(raw: &str) -> Result<Collection> {
    raw.parse().map_err(AppError::BadRequest)
}

/// Every document in the collection, in board order, each flagged with
/// whether it is on the display right now.
pub async fn list_content(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<AdminListItem>>> {
    let collection = parse_collection(&collection)?;
    let now = Utc::now();

    let records = state.service_context.content_store
        .list(collection, collection.display_order())
        .await?;

    Ok(Json(
        records
            .into_iter()
            .map(|record| AdminListItem::at(record, now))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub outcome: DeleteOutcome,
    pub message: Option<&'static str>,
}

pub async fn delete_content(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, Uuid)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>> {
    let collection = parse_collection(&collection)?;

    let outcome = state.service_context.editor
        .delete(collection, id, query.confirm.into())
        .await?;

    let message = match outcome {
        DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => Some(DELETED_MESSAGE),
        DeleteOutcome::Cancelled => None,
    };

    Ok(Json(DeleteResponse { outcome, message }))
}

#[derive(Debug, Serialize)]
struct ListUpdate {
    collection: Collection,
    items: Vec<AdminListItem>,
}

fn list_event(collection: Collection, result: Result<Vec<ContentRecord>>) -> Event {
    match result {
        Ok(records) => {
            let now = Utc::now();
            let update = ListUpdate {
                collection,
                items: records
                    .into_iter()
                    .map(|record| AdminListItem::at(record, now))
                    .collect(),
            };
            Event::default()
                .event("list")
                .json_data(&update)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
        }
        Err(e) => Event::default()
            .event("error")
            .data(format!("Error loading {}: {}", collection, e)),
    }
}

/// Live admin lists: one `list` event per collection on connect, then one per
/// change, until shutdown.
pub async fn stream_content(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let store = &state.service_context.content_store;

    let announcements = store
        .subscribe(ContentQuery::ordered(Collection::Announcements))
        .into_stream()
        .map(|result| Ok::<_, Infallible>(list_event(Collection::Announcements, result)));
    let events = store
        .subscribe(ContentQuery::ordered(Collection::Events))
        .into_stream()
        .map(|result| Ok::<_, Infallible>(list_event(Collection::Events, result)));

    let lists = futures_util::stream::select(announcements, events)
        .take_until(state.shutdown_signal());

    Sse::new(lists).keep_alive(KeepAlive::default())
}
