//! The admin editor: one form shared by both collections and by the create
//! and update paths.
//!
//! The editor is always in exactly one [`EditMode`], which decides where the
//! next submit writes. The mode is a plain value; the caller owns it and gets
//! the next one back from every operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{Collection, ContentPayload, ContentRecord},
    error::EditorError,
    store::ContentStore,
};

pub const CREATED_MESSAGE: &str = "Content created successfully!";
pub const UPDATED_MESSAGE: &str = "Content updated successfully!";
pub const DELETED_MESSAGE: &str = "Content deleted successfully!";
pub const EDITING_MESSAGE: &str = "Editing mode active. Make changes and click Update.";

const FORM_MINUTES: &str = "%Y-%m-%dT%H:%M";
const FORM_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const FORM_FRACTION: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Create,
    Edit { collection: Collection, id: Uuid },
}

impl EditMode {
    /// Switches to editing `record` and returns the form pre-filled from it.
    pub fn begin_edit(self, record: &ContentRecord, offset: FixedOffset) -> (EditMode, ContentForm) {
        let mode = EditMode::Edit {
            collection: record.collection,
            id: record.id,
        };
        (mode, ContentForm::from_record(record, offset))
    }

    /// Back to create mode with an empty form, whatever the current mode.
    pub fn cancel_edit(self) -> (EditMode, ContentForm) {
        (EditMode::Create, ContentForm::default())
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditMode::Edit { .. })
    }
}

/// Raw form values as typed by the editor. Dates use the `datetime-local`
/// input format and are read in the board's UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentForm {
    #[serde(rename = "type", default = "default_collection")]
    pub collection: Collection,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

fn default_collection() -> Collection {
    Collection::Announcements
}

impl Default for ContentForm {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            title: String::new(),
            content: String::new(),
            start_date: String::new(),
            end_date: String::new(),
        }
    }
}

impl ContentForm {
    pub fn from_record(record: &ContentRecord, offset: FixedOffset) -> Self {
        Self {
            collection: record.collection,
            title: record.title.clone(),
            content: record.content.clone(),
            start_date: format_form_date(record.start_date, offset),
            end_date: format_form_date(record.end_date, offset),
        }
    }
}

#[derive(Debug, Validate)]
struct FormFields {
    #[validate(length(min = 1))]
    title: String,
    #[validate(length(min = 1))]
    content: String,
    #[validate(length(min = 1))]
    start_date: String,
    #[validate(length(min = 1))]
    end_date: String,
}

impl FormFields {
    fn trimmed(form: &ContentForm) -> Self {
        Self {
            title: form.title.trim().to_string(),
            content: form.content.trim().to_string(),
            start_date: form.start_date.trim().to_string(),
            end_date: form.end_date.trim().to_string(),
        }
    }
}

pub fn parse_form_date(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, FORM_MINUTES)
        .or_else(|_| NaiveDateTime::parse_from_str(value, FORM_SECONDS))
        .or_else(|_| NaiveDateTime::parse_from_str(value, FORM_FRACTION))
        .ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Shortest form value that parses back to exactly `at`.
pub fn format_form_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    let format = if local.nanosecond() != 0 {
        FORM_FRACTION
    } else if local.second() != 0 {
        FORM_SECONDS
    } else {
        FORM_MINUTES
    };
    local.format(format).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created { record: ContentRecord },
    Updated { record: ContentRecord },
}

/// Result of a successful submit: the mode and form to continue with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub mode: EditMode,
    pub form: ContentForm,
    pub message: &'static str,
    /// After an update the client keeps the confirmation up this long before
    /// clearing the form.
    pub reset_after_ms: Option<u64>,
}

impl Submission {
    pub fn record(&self) -> &ContentRecord {
        match &self.outcome {
            SubmitOutcome::Created { record } | SubmitOutcome::Updated { record } => record,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The id was not in the collection; nothing changed.
    AlreadyGone,
    /// Confirmation was declined; no write was issued.
    Cancelled,
}

pub struct ContentEditor {
    store: Arc<ContentStore>,
    offset: FixedOffset,
    confirm_reset: Duration,
}

impl ContentEditor {
    pub fn new(store: Arc<ContentStore>, offset: FixedOffset, confirm_reset: Duration) -> Self {
        Self {
            store,
            offset,
            confirm_reset,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    pub async fn submit(&self, mode: EditMode, form: &ContentForm) -> Result<Submission, EditorError> {
        self.submit_at(mode, form, Utc::now()).await
    }

    /// Validates the form and issues exactly one write for it.
    ///
    /// On any error the caller keeps its current mode and form.
    pub async fn submit_at(
        &self,
        mode: EditMode,
        form: &ContentForm,
        now: DateTime<Utc>,
    ) -> Result<Submission, EditorError> {
        let payload = self.validate(mode, form, now)?;

        match mode {
            EditMode::Create => {
                let record = self
                    .store
                    .create(form.collection, payload)
                    .await
                    .map_err(|e| EditorError::Write(e.to_string()))?;

                Ok(Submission {
                    outcome: SubmitOutcome::Created { record },
                    mode: EditMode::Create,
                    form: ContentForm::default(),
                    message: CREATED_MESSAGE,
                    reset_after_ms: None,
                })
            }
            EditMode::Edit { collection, id } => {
                let record = self
                    .store
                    .update(collection, id, payload)
                    .await
                    .map_err(|e| EditorError::Write(e.to_string()))?;

                Ok(Submission {
                    outcome: SubmitOutcome::Updated { record },
                    mode: EditMode::Create,
                    form: ContentForm::default(),
                    message: UPDATED_MESSAGE,
                    reset_after_ms: Some(self.confirm_reset.as_millis() as u64),
                })
            }
        }
    }

    fn validate(
        &self,
        mode: EditMode,
        form: &ContentForm,
        now: DateTime<Utc>,
    ) -> Result<ContentPayload, EditorError> {
        let fields = FormFields::trimmed(form);

        if let Err(errors) = fields.validate() {
            let mut missing: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            missing.sort();
            return Err(EditorError::MissingFields(missing));
        }

        if let EditMode::Edit { collection, .. } = mode {
            if form.collection != collection {
                return Err(EditorError::CollectionLocked {
                    editing: collection,
                    requested: form.collection,
                });
            }
        }

        let start_date = parse_form_date(&fields.start_date, self.offset).ok_or_else(|| {
            EditorError::InvalidDate {
                field: "start_date",
                value: fields.start_date.clone(),
            }
        })?;
        let end_date = parse_form_date(&fields.end_date, self.offset).ok_or_else(|| {
            EditorError::InvalidDate {
                field: "end_date",
                value: fields.end_date.clone(),
            }
        })?;

        if end_date <= start_date {
            return Err(EditorError::EndNotAfterStart);
        }

        Ok(ContentPayload {
            title: fields.title,
            content: fields.content,
            start_date,
            end_date,
            updated_at: now,
        })
    }

    /// Deletes a document once the editor has confirmed. Irrecoverable.
    pub async fn delete(
        &self,
        collection: Collection,
        id: Uuid,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, EditorError> {
        if confirmation == Confirmation::Declined {
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = self
            .store
            .delete(collection, id)
            .await
            .map_err(|e| EditorError::Write(e.to_string()))?;

        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::AlreadyGone
        })
    }
}

#[derive(Debug, Default)]
struct EditorSlot {
    mode: EditMode,
    saving: bool,
}

/// Editor state per admin login session.
///
/// Each session has its own mode, and at most one submit in flight.
#[derive(Default)]
pub struct EditorSessions {
    slots: Mutex<HashMap<String, EditorSlot>>,
}

impl EditorSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, EditorSlot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mode(&self, session_id: &str) -> EditMode {
        self.slots()
            .get(session_id)
            .map(|slot| slot.mode)
            .unwrap_or_default()
    }

    pub fn set_mode(&self, session_id: &str, mode: EditMode) {
        self.slots().entry(session_id.to_string()).or_default().mode = mode;
    }

    pub fn remove(&self, session_id: &str) {
        self.slots().remove(session_id);
    }

    /// Drops editor state for sessions `keep` rejects. A session with a save
    /// in flight is kept until the save finishes.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.slots().retain(|session_id, slot| slot.saving || keep(session_id));
    }

    /// Runs one submit for the session, refusing a second while the first is
    /// still writing. The session's mode only moves on success.
    pub async fn submit(
        &self,
        session_id: &str,
        editor: &ContentEditor,
        form: &ContentForm,
    ) -> Result<Submission, EditorError> {
        let mut guard = self.begin_submit(session_id)?;
        let result = editor.submit(guard.mode, form).await;
        if let Ok(submission) = &result {
            guard.next_mode = Some(submission.mode);
        }
        result
    }

    fn begin_submit(&self, session_id: &str) -> Result<SubmitGuard<'_>, EditorError> {
        let mut slots = self.slots();
        let slot = slots.entry(session_id.to_string()).or_default();
        if slot.saving {
            return Err(EditorError::SaveInProgress);
        }
        slot.saving = true;

        Ok(SubmitGuard {
            sessions: self,
            session_id: session_id.to_string(),
            mode: slot.mode,
            next_mode: None,
        })
    }
}

// Clears the in-flight flag even if the request future is dropped mid-write.
struct SubmitGuard<'a> {
    sessions: &'a EditorSessions,
    session_id: String,
    mode: EditMode,
    next_mode: Option<EditMode>,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.sessions.slots();
        if let Some(slot) = slots.get_mut(&self.session_id) {
            slot.saving = false;
            // A begin-edit or cancel that landed mid-save wins.
            if let Some(mode) = self.next_mode.filter(|_| slot.mode == self.mode) {
                slot.mode = mode;
            }
        }
    }
}
