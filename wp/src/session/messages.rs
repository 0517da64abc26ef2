//! Session manager messages
//!
//! Commands and errors for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::{Session, SessionKey, SessionUpdate};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session channel closed")]
    Channel,

    /// Backend failure during the eager context load at creation.
    #[error(transparent)]
    Backend(#[from] boardclient::ClientError),
}

/// Response from session operations.
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to the SessionManager actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// Insert-or-return-existing for the session's key.
    Create {
        session: Session,
        reply: oneshot::Sender<Session>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Option<Session>>,
    },
    GetByKey {
        key: SessionKey,
        reply: oneshot::Sender<Option<Session>>,
    },
    List {
        reply: oneshot::Sender<Vec<Session>>,
    },
    Update {
        id: String,
        update: SessionUpdate,
        reply: oneshot::Sender<Option<Session>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}
