//! MCP SSE session registry
//!
//! Every `GET /sse` opens its own session, identified by a UUID that the client
//! learns from the initial `endpoint` event and echoes back as the `sessionId`
//! query parameter when posting messages. A session lives exactly as long as
//! its event stream: dropping the stream deregisters it and cancels whatever
//! work is still in flight for it.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
    time::Instant,
};

use axum::response::sse::Event;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;

pub const MESSAGES_PATH: &str = "/messages";

/// Server-to-client events carried over a session's SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// URI the client must POST its messages to.
    Endpoint(String),
    /// A serialized JSON-RPC message.
    Message(String),
}

impl SessionEvent {
    pub fn into_sse_event(self) -> Event {
        match self {
            Self::Endpoint(uri) => Event::default().event("endpoint").data(uri),
            Self::Message(json) => Event::default().event("message").data(json),
        }
    }
}

struct Session {
    sender: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
    opened_at: Instant,
}

/// Cloneable reference to a live session used by the message dispatcher.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    sender: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns false when the stream is already gone.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session and queues its `endpoint` event.
    pub fn open(&self) -> Result<(SessionHandle, SessionStream), AppError> {
        let id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = SessionHandle {
            id: id.clone(),
            sender: sender.clone(),
            cancel: cancel.clone(),
        };
        let stream = SessionStream {
            inner: UnboundedReceiverStream::new(receiver),
            _guard: SessionGuard {
                id: id.clone(),
                registry: self.clone(),
            },
        };

        self.lock().insert(
            id.clone(),
            Session {
                sender,
                cancel,
                opened_at: Instant::now(),
            },
        );

        // Cannot fail while `stream` holds the receiver. If the channel setup
        // ever changes so it can, dropping `stream` here deregisters the session.
        if !handle.send(SessionEvent::Endpoint(format!(
            "{MESSAGES_PATH}?sessionId={id}"
        ))) {
            return Err(AppError::TransportConnect(format!(
                "event stream for session {id} closed before the endpoint event"
            )));
        }

        info!(session_id = %id, active_sessions = self.len(), "session opened");
        Ok((handle, stream))
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.lock().get(id).map(|session| SessionHandle {
            id: id.to_string(),
            sender: session.sender.clone(),
            cancel: session.cancel.clone(),
        })
    }

    /// Removes the session and cancels its in-flight work. Closing an unknown
    /// or already closed session is a no-op that returns false.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(session) => {
                session.cancel.cancel();
                info!(
                    session_id = %id,
                    open_ms = session.opened_at.elapsed().as_millis(),
                    "session closed"
                );
                true
            }
            None => {
                debug!(session_id = %id, "session already closed");
                false
            }
        }
    }

    /// Closes every session; their streams end once pending events drain.
    pub fn close_all(&self) -> usize {
        let drained = self.lock().drain().collect::<Vec<_>>();
        for (_, session) in &drained {
            session.cancel.cancel();
        }
        if !drained.is_empty() {
            info!(closed = drained.len(), "closed all sessions");
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SessionGuard {
    id: String,
    registry: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.close(&self.id);
    }
}

/// Event stream bound to one session; dropping it closes the session.
pub struct SessionStream {
    inner: UnboundedReceiverStream<SessionEvent>,
    _guard: SessionGuard,
}

impl Stream for SessionStream {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
