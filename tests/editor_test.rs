use std::sync::Arc;
use std::time::Duration as StdDuration;

use bulletin::{
    domain::{Collection, ContentPayload, SortOrder},
    error::EditorError,
    repository::SqliteContentRepository,
    service::editor::{
        Confirmation, ContentEditor, ContentForm, DeleteOutcome, EditMode, EditorSessions,
        SubmitOutcome, CREATED_MESSAGE, UPDATED_MESSAGE,
    },
    store::ContentStore,
};
use chrono::{FixedOffset, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;

fn manila() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

async fn test_editor() -> anyhow::Result<ContentEditor> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let store = Arc::new(ContentStore::new(Arc::new(SqliteContentRepository::new(pool))));
    store.reload_all().await;
    Ok(ContentEditor::new(store, manila(), StdDuration::from_millis(1000)))
}

fn form(collection: Collection, title: &str, start: &str, end: &str) -> ContentForm {
    ContentForm {
        collection,
        title: title.to_string(),
        content: "Bring your ID".to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

async fn count(editor: &ContentEditor, collection: Collection) -> anyhow::Result<usize> {
    Ok(editor.store().list(collection, SortOrder::StartAsc).await?.len())
}

#[tokio::test]
async fn test_create_writes_one_document() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let submission = editor
        .submit_at(
            EditMode::Create,
            &form(Collection::Announcements, "  Enrollment  ", "2024-01-01T09:00", "2024-01-01T17:00"),
            now,
        )
        .await?;

    assert!(matches!(submission.outcome, SubmitOutcome::Created { .. }));
    assert_eq!(submission.message, CREATED_MESSAGE);
    assert_eq!(submission.mode, EditMode::Create);
    assert_eq!(submission.form, ContentForm::default());
    assert!(submission.reset_after_ms.is_none());

    let record = submission.record();
    assert_eq!(record.title, "Enrollment");
    assert_eq!(record.start_date, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    assert_eq!(record.created_at, now);
    assert_eq!(count(&editor, Collection::Announcements).await?, 1);
    assert_eq!(count(&editor, Collection::Events).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_forms_write_nothing() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let now = Utc::now();

    let blank_title = form(Collection::Events, "   ", "2024-01-01T09:00", "2024-01-01T10:00");
    let err = editor.submit_at(EditMode::Create, &blank_title, now).await.unwrap_err();
    assert_eq!(err, EditorError::MissingFields(vec!["title".to_string()]));
    assert_eq!(err.to_string(), "Please fill out all fields.");

    let mut empty = ContentForm::default();
    empty.collection = Collection::Events;
    let err = editor.submit_at(EditMode::Create, &empty, now).await.unwrap_err();
    assert_eq!(err.fields(), vec!["content", "end_date", "start_date", "title"]);

    let backwards = form(Collection::Events, "Seminar", "2024-01-01T10:00", "2024-01-01T09:00");
    let err = editor.submit_at(EditMode::Create, &backwards, now).await.unwrap_err();
    assert_eq!(err, EditorError::EndNotAfterStart);
    assert_eq!(err.to_string(), "End date must be later than start date.");

    let equal = form(Collection::Events, "Seminar", "2024-01-01T10:00", "2024-01-01T10:00");
    assert_eq!(
        editor.submit_at(EditMode::Create, &equal, now).await.unwrap_err(),
        EditorError::EndNotAfterStart
    );

    let garbled = form(Collection::Events, "Seminar", "next tuesday", "2024-01-01T10:00");
    assert!(matches!(
        editor.submit_at(EditMode::Create, &garbled, now).await.unwrap_err(),
        EditorError::InvalidDate { field: "start_date", .. }
    ));

    assert_eq!(count(&editor, Collection::Events).await?, 0);
    assert_eq!(count(&editor, Collection::Announcements).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_edit_updates_in_place() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let created_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let edited_at = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();

    let created = editor
        .submit_at(
            EditMode::Create,
            &form(Collection::Events, "Sportsfest", "2024-02-10T08:00", "2024-02-10T17:00"),
            created_at,
        )
        .await?
        .record()
        .clone();

    let (mode, mut prefilled) = EditMode::Create.begin_edit(&created, editor.offset());
    assert_eq!(prefilled.start_date, "2024-02-10T08:00");
    prefilled.title = "Sportsfest (rain date)".to_string();
    prefilled.start_date = "2024-02-17T08:00".to_string();
    prefilled.end_date = "2024-02-17T17:00".to_string();

    let submission = editor.submit_at(mode, &prefilled, edited_at).await?;
    assert!(matches!(submission.outcome, SubmitOutcome::Updated { .. }));
    assert_eq!(submission.message, UPDATED_MESSAGE);
    assert_eq!(submission.mode, EditMode::Create);
    assert_eq!(submission.reset_after_ms, Some(1000));

    let updated = submission.record();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Sportsfest (rain date)");
    assert_eq!(updated.created_at, created_at);
    assert_eq!(updated.updated_at, edited_at);
    assert_eq!(count(&editor, Collection::Events).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_unchanged_edit_round_trips_dates() -> anyhow::Result<()> {
    let editor = test_editor().await?;

    let created = editor
        .submit_at(
            EditMode::Create,
            &form(Collection::Announcements, "Exam week", "2024-03-04T07:30", "2024-03-08T18:00"),
            Utc::now(),
        )
        .await?
        .record()
        .clone();

    let (mode, prefilled) = EditMode::Create.begin_edit(&created, editor.offset());
    let updated = editor.submit(mode, &prefilled).await?.record().clone();
    assert_eq!(updated.start_date, created.start_date);
    assert_eq!(updated.end_date, created.end_date);

    Ok(())
}

#[tokio::test]
async fn test_unchanged_edit_keeps_sub_second_dates() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(250);
    let end = start + chrono::Duration::hours(2) + chrono::Duration::microseconds(17);

    let created = editor
        .store()
        .create(
            Collection::Announcements,
            ContentPayload {
                title: "Campus clean-up".to_string(),
                content: "Meet at the quadrangle".to_string(),
                start_date: start,
                end_date: end,
                updated_at: start,
            },
        )
        .await?;

    let (mode, prefilled) = EditMode::Create.begin_edit(&created, editor.offset());
    let updated = editor.submit(mode, &prefilled).await?.record().clone();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.start_date, start);
    assert_eq!(updated.end_date, end);

    Ok(())
}

#[tokio::test]
async fn test_cancel_then_submit_creates_new_document() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let original = editor
        .submit(
            EditMode::Create,
            &form(Collection::Events, "Blood drive", "2024-04-01T08:00", "2024-04-01T12:00"),
        )
        .await?
        .record()
        .clone();

    let (editing, _) = EditMode::Create.begin_edit(&original, editor.offset());
    let (mode, _) = editing.cancel_edit();
    assert_eq!(mode, EditMode::Create);

    let second = editor
        .submit(
            mode,
            &form(Collection::Events, "Blood drive", "2024-04-01T08:00", "2024-04-01T12:00"),
        )
        .await?;
    assert!(matches!(second.outcome, SubmitOutcome::Created { .. }));
    assert_ne!(second.record().id, original.id);
    assert_eq!(count(&editor, Collection::Events).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_collection_is_locked_while_editing() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let record = editor
        .submit(
            EditMode::Create,
            &form(Collection::Announcements, "Dress code", "2024-05-01T08:00", "2024-05-31T17:00"),
        )
        .await?
        .record()
        .clone();

    let (mode, mut prefilled) = EditMode::Create.begin_edit(&record, editor.offset());
    prefilled.collection = Collection::Events;

    let err = editor.submit(mode, &prefilled).await.unwrap_err();
    assert_eq!(
        err,
        EditorError::CollectionLocked {
            editing: Collection::Announcements,
            requested: Collection::Events,
        }
    );
    assert_eq!(count(&editor, Collection::Events).await?, 0);
    assert_eq!(editor.store().find(Collection::Announcements, record.id).await?, Some(record));

    Ok(())
}

#[tokio::test]
async fn test_update_of_deleted_document_reports_write_error() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let record = editor
        .submit(
            EditMode::Create,
            &form(Collection::Events, "Field trip", "2024-06-01T06:00", "2024-06-01T18:00"),
        )
        .await?
        .record()
        .clone();

    let (mode, prefilled) = EditMode::Create.begin_edit(&record, editor.offset());
    editor.delete(Collection::Events, record.id, Confirmation::Confirmed).await?;

    let err = editor.submit(mode, &prefilled).await.unwrap_err();
    assert!(matches!(err, EditorError::Write(_)));
    assert!(err.to_string().starts_with("Error: "));
    assert_eq!(count(&editor, Collection::Events).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_requires_confirmation() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let record = editor
        .submit(
            EditMode::Create,
            &form(Collection::Announcements, "Holiday", "2024-06-12T00:00", "2024-06-12T23:59"),
        )
        .await?
        .record()
        .clone();

    let declined = editor.delete(Collection::Announcements, record.id, false.into()).await?;
    assert_eq!(declined, DeleteOutcome::Cancelled);
    assert_eq!(count(&editor, Collection::Announcements).await?, 1);

    let deleted = editor.delete(Collection::Announcements, record.id, true.into()).await?;
    assert_eq!(deleted, DeleteOutcome::Deleted);
    assert_eq!(count(&editor, Collection::Announcements).await?, 0);

    let again = editor.delete(Collection::Announcements, record.id, true.into()).await?;
    assert_eq!(again, DeleteOutcome::AlreadyGone);

    Ok(())
}

#[tokio::test]
async fn test_sessions_move_mode_only_on_success() -> anyhow::Result<()> {
    let editor = test_editor().await?;
    let sessions = EditorSessions::new();

    let record = sessions
        .submit(
            "s1",
            &editor,
            &form(Collection::Events, "Quiz bee", "2024-07-01T13:00", "2024-07-01T16:00"),
        )
        .await?
        .record()
        .clone();

    let (mode, mut prefilled) = sessions.mode("s1").begin_edit(&record, editor.offset());
    sessions.set_mode("s1", mode);

    // A rejected submit leaves the session editing
    prefilled.title.clear();
    assert!(sessions.submit("s1", &editor, &prefilled).await.is_err());
    assert!(sessions.mode("s1").is_editing());

    prefilled.title = "Quiz bee finals".to_string();
    let submission = sessions.submit("s1", &editor, &prefilled).await?;
    assert!(matches!(submission.outcome, SubmitOutcome::Updated { .. }));
    assert_eq!(sessions.mode("s1"), EditMode::Create);

    Ok(())
}
