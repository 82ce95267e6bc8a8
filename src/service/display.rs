//! The public display: what is on the board right now.
//!
//! [`DisplayBoard`] keeps the latest snapshot of each collection and renders
//! the active subset for a given instant. [`run_display`] drives it, waking on
//! store pushes and again whenever a window opens or closes, so an item leaves
//! the board when its end passes even if nothing in the store changed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    config::DisplayConfig,
    domain::{active_at, next_transition, sort_records, Collection, ContentRecord},
    error::Result,
    store::{ContentQuery, SnapshotSource},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loading,
    Loaded(Vec<ContentRecord>),
    Failed(String),
}

/// One list region of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardList {
    pub items: Vec<ContentRecord>,
    pub count: usize,
    pub loading: bool,
    /// Shown in place of the items when there are none or loading failed.
    pub placeholder: Option<String>,
}

impl BoardList {
    fn render(collection: Collection, state: &ListState, at: DateTime<Utc>) -> Self {
        match state {
            ListState::Loading => Self {
                items: Vec::new(),
                count: 0,
                loading: true,
                placeholder: None,
            },
            ListState::Failed(_) => Self {
                items: Vec::new(),
                count: 0,
                loading: false,
                placeholder: Some(format!("Error loading {}", collection)),
            },
            ListState::Loaded(records) => {
                let mut items: Vec<ContentRecord> = active_at(records, at).cloned().collect();
                sort_records(&mut items, collection.display_order());
                let placeholder = items
                    .is_empty()
                    .then(|| format!("No active {}s yet", collection.singular()));
                Self {
                    count: items.len(),
                    items,
                    loading: false,
                    placeholder,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub announcements: BoardList,
    pub events: BoardList,
    pub evaluated_at: DateTime<Utc>,
    /// When the active set will next change without any store push.
    pub next_transition: Option<DateTime<Utc>>,
}

impl BoardView {
    pub fn loading(at: DateTime<Utc>) -> Self {
        DisplayBoard::new().view(at)
    }

    /// Same items and messages, ignoring when it was evaluated.
    pub fn same_content(&self, other: &BoardView) -> bool {
        self.announcements == other.announcements
            && self.events == other.events
            && self.next_transition == other.next_transition
    }
}

#[derive(Debug, Clone)]
pub struct DisplayBoard {
    announcements: ListState,
    events: ListState,
}

impl Default for DisplayBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBoard {
    pub fn new() -> Self {
        Self {
            announcements: ListState::Loading,
            events: ListState::Loading,
        }
    }

    fn state_mut(&mut self, collection: Collection) -> &mut ListState {
        match collection {
            Collection::Announcements => &mut self.announcements,
            Collection::Events => &mut self.events,
        }
    }

    /// Takes one subscription result for `collection`. A failure replaces the
    /// list with an error until the next good snapshot.
    pub fn apply(&mut self, collection: Collection, result: Result<Vec<ContentRecord>>) {
        let state = match result {
            Ok(records) => ListState::Loaded(records),
            Err(e) => {
                tracing::error!(collection = %collection, error = %e, "display snapshot error");
                ListState::Failed(e.to_string())
            }
        };
        *self.state_mut(collection) = state;
    }

    pub fn view(&self, at: DateTime<Utc>) -> BoardView {
        let loaded = [&self.announcements, &self.events]
            .into_iter()
            .filter_map(|state| match state {
                ListState::Loaded(records) => Some(records.iter()),
                _ => None,
            })
            .flatten();

        BoardView {
            announcements: BoardList::render(Collection::Announcements, &self.announcements, at),
            events: BoardList::render(Collection::Events, &self.events, at),
            evaluated_at: at,
            next_transition: next_transition(loaded, at),
        }
    }
}

/// How long to sleep before the board must be looked at again.
pub fn wake_after(view: &BoardView, now: DateTime<Utc>, refresh_interval: Duration) -> Duration {
    view.next_transition
        .map(|at| (at - now).to_std().unwrap_or(Duration::ZERO))
        .map(|until| until.min(refresh_interval))
        .unwrap_or(refresh_interval)
}

/// Keeps `board_tx` current until `shutdown` flips to true.
///
/// Re-evaluates on every push from either subscription, at the next window
/// transition (capped by the refresh interval), and on the forced reload
/// interval, which also re-reads both collections from storage.
pub async fn run_display(
    source: Arc<dyn SnapshotSource>,
    config: DisplayConfig,
    board_tx: watch::Sender<BoardView>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut board = DisplayBoard::new();
    let mut announcements = source.subscribe(ContentQuery::ordered(Collection::Announcements));
    let mut events = source.subscribe(ContentQuery::ordered(Collection::Events));

    let reload_every = config.reload_interval();
    let mut reload = tokio::time::interval_at(tokio::time::Instant::now() + reload_every, reload_every);

    tracing::info!(
        refresh_secs = config.refresh_interval().as_secs(),
        reload_secs = reload_every.as_secs(),
        "display board started"
    );

    loop {
        let now = Utc::now();
        let view = board.view(now);
        let wake = wake_after(&view, now, config.refresh_interval());

        board_tx.send_if_modified(|current| {
            if current.same_content(&view) {
                false
            } else {
                tracing::debug!(
                    announcements = view.announcements.count,
                    events = view.events.count,
                    "board changed"
                );
                *current = view;
                true
            }
        });

        tokio::select! {
            Some(result) = announcements.next() => board.apply(Collection::Announcements, result),
            Some(result) = events.next() => board.apply(Collection::Events, result),
            _ = tokio::time::sleep(wake) => {}
            _ = reload.tick() => {
                tracing::info!("Auto-refreshing display");
                source.reload(Collection::Announcements).await;
                source.reload(Collection::Events).await;
                announcements.restart();
                events.restart();
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("display board stopped");
}
