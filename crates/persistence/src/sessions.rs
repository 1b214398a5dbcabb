//! Filesystem-backed session store
//!
//! One directory per session under the base directory:
//!
//! ```text
//! {base_dir}/{session_id}/
//!   metadata.json      Session
//!   conversation.json  [ConversationMessage]
//!   results.json       EvaluationResult
//!   audio/             input_{n}.wav, response_{n}.mp3, extracted.wav, feedback.mp3
//!   video/             input.<ext>
//!   animation/         <audio stem>.json
//! ```
//!
//! Writes to one session are serialized through a per-id async mutex.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use coach_core::{ConversationMessage, EvaluationResult, Session, SessionFilter, SessionType};

use crate::atomic::{read_json, write_bytes, write_json};
use crate::PersistenceError;

const METADATA_FILE: &str = "metadata.json";
const CONVERSATION_FILE: &str = "conversation.json";
const RESULTS_FILE: &str = "results.json";

/// Read-modify-write closure applied under the session's lock
pub type SessionMutator<'a> =
    Box<dyn FnOnce(&mut Session) -> coach_core::Result<()> + Send + 'a>;

/// Artifact subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Audio,
    Video,
    Animation,
}

impl FileKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Animation => "animation",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "animation" => Some(Self::Animation),
            _ => None,
        }
    }
}

/// Location of a stored artifact
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub url: String,
}

/// Session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new active session
    async fn create(
        &self,
        session_type: SessionType,
        user_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> coach_core::Result<Session>;

    async fn get(&self, id: &str) -> coach_core::Result<Session>;

    /// Apply `mutator` and persist; nothing is written if it fails
    async fn update(&self, id: &str, mutator: SessionMutator<'_>) -> coach_core::Result<Session>;

    /// Newest first
    async fn list(&self, filter: &SessionFilter) -> coach_core::Result<Vec<Session>>;

    async fn delete(&self, id: &str) -> coach_core::Result<()>;

    /// Resolve where an artifact lives without writing it
    fn file_location(&self, id: &str, kind: FileKind, name: &str) -> coach_core::Result<StoredFile>;

    /// Map a public URL handed out by this store back to its session file
    fn locate_url(&self, url: &str) -> coach_core::Result<(String, FileKind, StoredFile)>;

    async fn attach_file(
        &self,
        id: &str,
        kind: FileKind,
        name: &str,
        bytes: &[u8],
    ) -> coach_core::Result<StoredFile>;

    /// Append to the conversation log; returns the new message count
    async fn append_message(
        &self,
        id: &str,
        message: ConversationMessage,
    ) -> coach_core::Result<usize>;

    /// Append a user message and its reply in one write; returns the new message count
    async fn append_turn(
        &self,
        id: &str,
        user: ConversationMessage,
        assistant: ConversationMessage,
    ) -> coach_core::Result<usize>;

    async fn history(&self, id: &str) -> coach_core::Result<Vec<ConversationMessage>>;

    async fn save_results(&self, id: &str, results: &EvaluationResult) -> coach_core::Result<()>;

    async fn get_results(&self, id: &str) -> coach_core::Result<Option<EvaluationResult>>;

    /// Remove terminal sessions last updated before `cutoff`
    async fn sweep_before(&self, cutoff: DateTime<Utc>) -> coach_core::Result<usize>;

    /// Remove terminal sessions idle for longer than `ttl`
    async fn sweep(&self, ttl: Duration) -> coach_core::Result<usize> {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let cutoff = Utc::now()
            .checked_sub_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.sweep_before(cutoff).await
    }
}

/// Session store rooted at a local directory
pub struct FileSessionStore {
    base_dir: PathBuf,
    public_prefix: String,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileSessionStore {
    /// Open the store, creating `base_dir` if needed
    pub async fn open(
        base_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| PersistenceError::io(&base_dir, e))?;

        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        tracing::info!(base_dir = %base_dir.display(), "Session store opened");

        Ok(Self {
            base_dir,
            public_prefix,
            locks: DashMap::new(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Session directory; ids are UUIDs so they never escape the base dir
    fn session_dir(&self, id: &str) -> Result<PathBuf, PersistenceError> {
        uuid::Uuid::parse_str(id).map_err(|_| PersistenceError::NotFound(id.to_string()))?;
        Ok(self.base_dir.join(id))
    }

    async fn existing_dir(&self, id: &str) -> Result<PathBuf, PersistenceError> {
        let dir = self.session_dir(id)?;
        if tokio::fs::try_exists(dir.join(METADATA_FILE))
            .await
            .unwrap_or(false)
        {
            Ok(dir)
        } else {
            Err(PersistenceError::NotFound(id.to_string()))
        }
    }

    async fn read_session(&self, dir: &Path, id: &str) -> Result<Session, PersistenceError> {
        read_json(&dir.join(METADATA_FILE))
            .await?
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }

    fn url_for(&self, id: &str, kind: FileKind, name: &str) -> String {
        format!("{}/{}/{}/{}", self.public_prefix, id, kind.dir_name(), name)
    }

    async fn remove_dir(&self, id: &str, dir: &Path) -> Result<(), PersistenceError> {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| PersistenceError::io(dir, e))?;
        self.locks.remove(id);
        Ok(())
    }
}

fn validate_file_name(name: &str) -> Result<(), PersistenceError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidFileName(name.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(
        &self,
        session_type: SessionType,
        user_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> coach_core::Result<Session> {
        let mut session = Session::new(session_type).with_metadata(metadata);
        session.user_id = user_id;

        let dir = self.session_dir(&session.id)?;
        for sub in [FileKind::Audio, FileKind::Video] {
            let path = dir.join(sub.dir_name());
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| PersistenceError::io(&path, e))?;
        }
        write_json(&dir.join(METADATA_FILE), &session).await?;

        tracing::info!(
            session_id = %session.id,
            session_type = session.session_type.as_str(),
            "Session created"
        );
        Ok(session)
    }

    async fn get(&self, id: &str) -> coach_core::Result<Session> {
        let dir = self.session_dir(id)?;
        Ok(self.read_session(&dir, id).await?)
    }

    async fn update(&self, id: &str, mutator: SessionMutator<'_>) -> coach_core::Result<Session> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.existing_dir(id).await?;
        let mut session = self.read_session(&dir, id).await?;
        mutator(&mut session)?;
        session.touch();
        write_json(&dir.join(METADATA_FILE), &session).await?;

        tracing::debug!(session_id = %id, status = %session.status, "Session updated");
        Ok(session)
    }

    async fn list(&self, filter: &SessionFilter) -> coach_core::Result<Vec<Session>> {
        let mut entries = tokio::fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| PersistenceError::io(&self.base_dir, e))?;

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PersistenceError::io(&self.base_dir, e))?
        {
            let path = entry.path().join(METADATA_FILE);
            match read_json::<Session>(&path).await {
                Ok(Some(session)) if filter.matches(&session) => sessions.push(session),
                Ok(_) => {},
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session");
                },
            }
        }

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete(&self, id: &str) -> coach_core::Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.existing_dir(id).await?;
        self.remove_dir(id, &dir).await?;
        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }

    fn file_location(&self, id: &str, kind: FileKind, name: &str) -> coach_core::Result<StoredFile> {
        validate_file_name(name)?;
        let dir = self.session_dir(id)?;
        Ok(StoredFile {
            path: dir.join(kind.dir_name()).join(name),
            url: self.url_for(id, kind, name),
        })
    }

    fn locate_url(&self, url: &str) -> coach_core::Result<(String, FileKind, StoredFile)> {
        let not_found = || PersistenceError::NotFound(url.to_string());

        let path = url.split(['?', '#']).next().unwrap_or_default();
        let rest = path
            .strip_prefix(self.public_prefix.as_str())
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(not_found)?;

        let mut parts = rest.split('/');
        let (Some(id), Some(kind), Some(name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(not_found().into());
        };
        let kind = FileKind::from_dir_name(kind).ok_or_else(not_found)?;

        let location = self.file_location(id, kind, name)?;
        Ok((id.to_string(), kind, location))
    }

    async fn attach_file(
        &self,
        id: &str,
        kind: FileKind,
        name: &str,
        bytes: &[u8],
    ) -> coach_core::Result<StoredFile> {
        let location = self.file_location(id, kind, name)?;
        self.existing_dir(id).await?;

        if let Some(parent) = location.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }
        write_bytes(&location.path, bytes).await?;

        tracing::debug!(
            session_id = %id,
            file = %location.url,
            bytes = bytes.len(),
            "Artifact stored"
        );
        Ok(location)
    }

    async fn append_message(
        &self,
        id: &str,
        message: ConversationMessage,
    ) -> coach_core::Result<usize> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.existing_dir(id).await?;
        let path = dir.join(CONVERSATION_FILE);
        let mut messages: Vec<ConversationMessage> = read_json(&path).await?.unwrap_or_default();
        messages.push(message);
        write_json(&path, &messages).await?;
        Ok(messages.len())
    }

    async fn append_turn(
        &self,
        id: &str,
        user: ConversationMessage,
        assistant: ConversationMessage,
    ) -> coach_core::Result<usize> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.existing_dir(id).await?;
        let path = dir.join(CONVERSATION_FILE);
        let mut messages: Vec<ConversationMessage> = read_json(&path).await?.unwrap_or_default();
        messages.push(user);
        messages.push(assistant);
        // one rename publishes both or neither
        write_json(&path, &messages).await?;
        Ok(messages.len())
    }

    async fn history(&self, id: &str) -> coach_core::Result<Vec<ConversationMessage>> {
        let dir = self.existing_dir(id).await?;
        Ok(read_json(&dir.join(CONVERSATION_FILE))
            .await?
            .unwrap_or_default())
    }

    async fn save_results(&self, id: &str, results: &EvaluationResult) -> coach_core::Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.existing_dir(id).await?;
        write_json(&dir.join(RESULTS_FILE), results).await?;
        Ok(())
    }

    async fn get_results(&self, id: &str) -> coach_core::Result<Option<EvaluationResult>> {
        let dir = self.existing_dir(id).await?;
        Ok(read_json(&dir.join(RESULTS_FILE)).await?)
    }

    async fn sweep_before(&self, cutoff: DateTime<Utc>) -> coach_core::Result<usize> {
        let expired: Vec<Session> = self
            .list(&SessionFilter::default())
            .await?
            .into_iter()
            .filter(|s| s.is_terminal() && s.updated_at < cutoff)
            .collect();

        let mut removed = 0;
        for session in expired {
            let lock = self.lock_for(&session.id);
            let _guard = lock.lock().await;

            let dir = self.base_dir.join(&session.id);
            // re-read under the lock; a re-run may have reactivated it
            match self.read_session(&dir, &session.id).await {
                Ok(current) if current.is_terminal() && current.updated_at < cutoff => {},
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Sweep skipped session");
                    continue;
                },
            }

            match self.remove_dir(&session.id, &dir).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Sweep failed to remove session");
                },
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Expired sessions swept");
        }
        Ok(removed)
    }
}
