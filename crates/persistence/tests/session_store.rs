//! FileSessionStore behaviour against a temporary directory

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use coach_core::{
    ConversationMessage, Error, MessageRole, SessionFilter, SessionStatus, SessionType,
};
use coach_persistence::{spawn_sweeper, FileKind, FileSessionStore, SessionStore};
use tempfile::TempDir;

async fn store() -> (TempDir, FileSessionStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::open(dir.path().join("sessions"), "/files")
        .await
        .unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_round_trip_preserves_session() {
    let (_dir, store) = store().await;
    let mut metadata = BTreeMap::new();
    metadata.insert("topic".to_string(), serde_json::json!("interview"));

    let created = store
        .create(SessionType::Evaluation, Some("u-1".into()), metadata)
        .await
        .unwrap();
    let read = store.get(&created.id).await.unwrap();
    assert_eq!(read, created);

    let updated = store
        .update(
            &created.id,
            Box::new(|s| s.set_meta("video_filename", "talk.mp4")),
        )
        .await
        .unwrap();
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.meta_str("topic"), Some("interview"));
    assert_eq!(updated.meta_str("video_filename"), Some("talk.mp4"));
}

#[tokio::test]
async fn test_missing_session_is_not_found() {
    let (_dir, store) = store().await;
    let id = uuid::Uuid::new_v4().to_string();
    assert!(matches!(store.get(&id).await, Err(Error::NotFound(_))));
    assert!(matches!(store.delete(&id).await, Err(Error::NotFound(_))));
    assert!(matches!(store.history(&id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_failed_mutator_writes_nothing() {
    let (_dir, store) = store().await;
    let session = store
        .create(SessionType::Evaluation, None, BTreeMap::new())
        .await
        .unwrap();

    let err = store
        .update(&session.id, Box::new(|s| s.transition(SessionStatus::Failed)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    assert_eq!(store.get(&session.id).await.unwrap(), session);
}

#[tokio::test]
async fn test_messages_keep_insertion_order() {
    let (_dir, store) = store().await;
    let session = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();

    for n in 0..3 {
        store
            .append_message(&session.id, ConversationMessage::user(format!("q{}", n)))
            .await
            .unwrap();
        let count = store
            .append_message(&session.id, ConversationMessage::assistant(format!("a{}", n)))
            .await
            .unwrap();
        assert_eq!(count, (n + 1) * 2);
    }

    let history = store.history(&session.id).await.unwrap();
    assert_eq!(history.len(), 6);
    for (i, message) in history.iter().enumerate() {
        let expected = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        assert_eq!(message.role, expected);
    }
    assert_eq!(history[4].content, "q2");
}

#[tokio::test]
async fn test_concurrent_turn_appends_stay_paired() {
    let (_dir, store) = store().await;
    let store = Arc::new(store);
    let session = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let store = store.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                store
                    .append_turn(
                        &id,
                        ConversationMessage::user(format!("q{}", n)),
                        ConversationMessage::assistant(format!("a{}", n)),
                    )
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let history = store.history(&session.id).await.unwrap();
    assert_eq!(history.len(), 16);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[0].content[1..], pair[1].content[1..]);
    }
}

#[tokio::test]
async fn test_concurrent_appends_are_serialized() {
    let (_dir, store) = store().await;
    let store = Arc::new(store);
    let session = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let store = store.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                store
                    .append_message(&id, ConversationMessage::user(n.to_string()))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.history(&session.id).await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_attach_file_writes_bytes_and_builds_url() {
    let (_dir, store) = store().await;
    let session = store
        .create(SessionType::Evaluation, None, BTreeMap::new())
        .await
        .unwrap();

    let stored = store
        .attach_file(&session.id, FileKind::Video, "input.mp4", b"video-bytes")
        .await
        .unwrap();
    assert_eq!(stored.url, format!("/files/{}/video/input.mp4", session.id));
    assert_eq!(std::fs::read(&stored.path).unwrap(), b"video-bytes");

    let err = store
        .attach_file(&session.id, FileKind::Audio, "../metadata.json", b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_list_filters_by_type_and_status() {
    let (_dir, store) = store().await;
    let conversation = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();
    let evaluation = store
        .create(SessionType::Evaluation, None, BTreeMap::new())
        .await
        .unwrap();
    store
        .update(
            &conversation.id,
            Box::new(|s| s.transition(SessionStatus::Completed)),
        )
        .await
        .unwrap();

    let all = store.list(&SessionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let evaluations = store
        .list(&SessionFilter {
            session_type: Some(SessionType::Evaluation),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].id, evaluation.id);

    let completed = store
        .list(&SessionFilter {
            status: Some(SessionStatus::Completed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, conversation.id);
}

#[tokio::test]
async fn test_sweep_removes_only_expired_terminal_sessions() {
    let (_dir, store) = store().await;
    let active = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();
    let ended = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();
    store
        .update(&ended.id, Box::new(|s| s.transition(SessionStatus::Completed)))
        .await
        .unwrap();

    // nothing is older than an hour ago
    let kept = store
        .sweep_before(Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(kept, 0);

    let removed = store
        .sweep_before(Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.get(&active.id).await.is_ok());
    assert!(matches!(store.get(&ended.id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_sweeper_stops_on_shutdown() {
    let (_dir, store) = store().await;
    let store: Arc<dyn SessionStore> = Arc::new(store);
    let ended = store
        .create(SessionType::Conversation, None, BTreeMap::new())
        .await
        .unwrap();
    store
        .update(&ended.id, Box::new(|s| s.transition(SessionStatus::Completed)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let handle = spawn_sweeper(store.clone(), Duration::ZERO, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    assert!(matches!(store.get(&ended.id).await, Err(Error::NotFound(_))));
}
