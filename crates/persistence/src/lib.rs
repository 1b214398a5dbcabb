//! Filesystem persistence for coaching sessions
//!
//! - [`FileSessionStore`]: one directory per session, atomic JSON writes,
//!   per-session write serialization
//! - [`spawn_sweeper`]: background removal of expired terminal sessions

pub mod atomic;
pub mod error;
pub mod sessions;
pub mod sweeper;

pub use error::PersistenceError;
pub use sessions::{FileKind, FileSessionStore, SessionMutator, SessionStore, StoredFile};
pub use sweeper::{spawn_sweeper, SweeperHandle};
