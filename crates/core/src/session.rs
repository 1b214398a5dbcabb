//! Session model
//!
//! A session is the unit of state for one conversation or one evaluation.
//! Status only moves along the edges allowed by [`SessionStatus::can_transition`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Session type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Conversation,
    Evaluation,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Evaluation => "evaluation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conversation" => Some(Self::Conversation),
            "evaluation" => Some(Self::Evaluation),
            _ => None,
        }
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Allowed status edges per session type
    ///
    /// Conversation: `active -> completed`.
    /// Evaluation: `active -> processing -> {completed | failed}`, plus
    /// `{completed | failed} -> processing` for a fresh re-run of the whole
    /// pipeline.
    pub fn can_transition(self, to: SessionStatus, session_type: SessionType) -> bool {
        use SessionStatus::*;
        match session_type {
            SessionType::Conversation => matches!((self, to), (Active, Completed)),
            SessionType::Evaluation => matches!(
                (self, to),
                (Active, Processing)
                    | (Processing, Completed)
                    | (Processing, Failed)
                    | (Completed, Processing)
                    | (Failed, Processing)
            ),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session record persisted as `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Session {
    pub fn new(session_type: SessionType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            session_type,
            created_at: now,
            updated_at: now,
            status: SessionStatus::Active,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Move to `to`, rejecting edges the state machine does not allow
    pub fn transition(&mut self, to: SessionStatus) -> Result<()> {
        if !self.status.can_transition(to, self.session_type) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Bump `updated_at`, never moving it backwards
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.metadata.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Decode a typed metadata entry
    pub fn meta<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.metadata
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Filter for listing sessions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        self.session_type.map_or(true, |t| t == session.session_type)
            && self.status.map_or(true, |s| s == session.status)
            && self
                .user_id
                .as_deref()
                .map_or(true, |u| session.user_id.as_deref() == Some(u))
    }
}
