//! SessionManager - actor that owns the SessionStore
//!
//! Commands flow over an mpsc channel, so the session map and its key index
//! mutate from a single task and always move together. Handles are cheap to
//! clone and share across stages.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{SessionCommand, SessionError, SessionResponse};
use super::store::SessionStore;
use super::{Session, SessionKey, SessionUpdate};

/// Handle to send commands to the SessionManager actor.
#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionManager {
    /// Spawn the actor with an empty store.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(SessionStore::new(), rx));
        info!("SessionManager spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        command: SessionCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> SessionResponse<T> {
        self.tx.send(command).await.map_err(|_| SessionError::Channel)?;
        reply_rx.await.map_err(|_| SessionError::Channel)
    }

    /// Idempotent create: returns the existing session when the key is
    /// already bound.
    pub async fn create(&self, session: Session) -> SessionResponse<Session> {
        debug!(session_id = %session.id, item_id = session.key.item_id, "create: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Create {
                session,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    pub async fn get(&self, id: &str) -> SessionResponse<Option<Session>> {
        debug!(%id, "get: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Get {
                id: id.to_string(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Get a session by id, failing with `NotFound` when absent.
    pub async fn get_required(&self, id: &str) -> Result<Session, SessionError> {
        self.get(id).await?.ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn get_by_key(&self, key: &SessionKey) -> SessionResponse<Option<Session>> {
        debug!(organization = %key.organization, item_id = key.item_id, "get_by_key: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::GetByKey {
                key: key.clone(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    pub async fn list(&self) -> SessionResponse<Vec<Session>> {
        debug!("list: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(SessionCommand::List { reply: reply_tx }, reply_rx).await
    }

    /// Merge partial changes; `None` when the id is unknown.
    pub async fn update(&self, id: &str, update: SessionUpdate) -> SessionResponse<Option<Session>> {
        debug!(%id, stage = ?update.stage, "update: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Update {
                id: id.to_string(),
                update,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> SessionResponse<bool> {
        debug!(%id, "delete: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Delete {
                id: id.to_string(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Stop the actor. Outstanding handles fail with `Channel` afterwards.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Channel)
    }
}

/// The actor loop that owns the store and processes commands.
async fn actor_loop(mut store: SessionStore, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("SessionManager actor started");

    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Create { session, reply } => {
                let _ = reply.send(store.insert(session));
            }
            SessionCommand::Get { id, reply } => {
                let _ = reply.send(store.get(&id));
            }
            SessionCommand::GetByKey { key, reply } => {
                let _ = reply.send(store.get_by_key(&key));
            }
            SessionCommand::List { reply } => {
                let _ = reply.send(store.list());
            }
            SessionCommand::Update { id, update, reply } => {
                let _ = reply.send(store.update(&id, update));
            }
            SessionCommand::Delete { id, reply } => {
                let _ = reply.send(store.delete(&id));
            }
            SessionCommand::Shutdown => {
                info!("SessionManager shutting down");
                break;
            }
        }
    }

    debug!("SessionManager actor stopped");
}
