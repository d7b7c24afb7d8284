//! Analysis engine: owns the sessions, executes the requests they issue and
//! notifies subscribers of every state change.
//!
//! Events for one session are applied one at a time under that session's
//! lock, in arrival order. Network calls run on spawned tasks and come back
//! as `ResponseArrived` / `ResponseFailed` events carrying their token.
//! Sessions share nothing but the credential store and the request limiter.

pub mod state;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, SessionUpdate};
use crate::client::AnalysisBackend;
use crate::constants::limits;
use crate::credential::CredentialStore;
use crate::domain::AnalysisTarget;
use crate::error::{AnalysisError, SessionError};

pub use state::{
    AnalysisSession, IssuedRequest, RequestToken, SessionEvent, SessionState, Transition,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Returned by `open_session`; identifies the session in later calls
#[derive(Clone, Debug, PartialEq)]
pub struct SessionHandle {
    id: SessionId,
    target: AnalysisTarget,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target(&self) -> &AnalysisTarget {
        &self.target
    }
}

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct SessionSlot {
    session: AnalysisSession,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

fn lock(slot: &Mutex<SessionSlot>) -> MutexGuard<'_, SessionSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Detaches its listener when dropped or when `unsubscribe` is called
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    slot: Weak<Mutex<SessionSlot>>,
    listener_id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            lock(&slot)
                .listeners
                .retain(|(id, _)| *id != self.listener_id);
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Backend calls allowed in flight across all sessions
    pub max_concurrent_requests: usize,
    pub bus_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: limits::DEFAULT_MAX_CONCURRENT_REQUESTS,
            bus_capacity: limits::DEFAULT_BUS_CAPACITY,
        }
    }
}

struct EngineInner {
    credentials: CredentialStore,
    backend: Arc<dyn AnalysisBackend>,
    sessions: DashMap<SessionId, Arc<Mutex<SessionSlot>>>,
    limiter: Arc<Semaphore>,
    bus: EventBus,
    /// Runtime current at construction, if any
    runtime: Option<Handle>,
}

#[derive(Clone)]
pub struct AnalysisEngine {
    inner: Arc<EngineInner>,
}

impl AnalysisEngine {
    pub fn new(
        credentials: CredentialStore,
        backend: Arc<dyn AnalysisBackend>,
        options: EngineOptions,
    ) -> Self {
        let permits = options.max_concurrent_requests.max(1);
        info!(
            "🧠 [ENGINE] Analysis engine ready (backend: {}, max concurrent: {})",
            backend.name(),
            permits
        );
        Self {
            inner: Arc::new(EngineInner {
                credentials,
                backend,
                sessions: DashMap::new(),
                limiter: Arc::new(Semaphore::new(permits)),
                bus: EventBus::new(options.bus_capacity.max(1)),
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn open_session(&self, target: AnalysisTarget) -> SessionHandle {
        let id = SessionId::new();
        info!("🧠 [SESSION] Opened {} for {}", id, target);
        let slot = SessionSlot {
            session: AnalysisSession::new(target.clone()),
            listeners: Vec::new(),
            next_listener_id: 0,
        };
        self.inner.sessions.insert(id, Arc::new(Mutex::new(slot)));
        SessionHandle { id, target }
    }

    /// Discard a session. A reply still in flight for it is dropped on arrival.
    pub fn close_session(&self, handle: &SessionHandle) -> bool {
        let removed = self.inner.sessions.remove(&handle.id).is_some();
        if removed {
            info!("🧠 [SESSION] Closed {}", handle.id);
        }
        removed
    }

    /// Handle for a session id, if it is still open
    pub fn find(&self, id: SessionId) -> Option<SessionHandle> {
        let slot = self.inner.sessions.get(&id)?.value().clone();
        let target = lock(&slot).session.target().clone();
        Some(SessionHandle { id, target })
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.inner.sessions.iter().map(|e| *e.key()).collect()
    }

    pub fn state(&self, handle: &SessionHandle) -> Result<SessionState, SessionError> {
        let slot = self.slot(handle.id)?;
        let state = lock(&slot).session.state().clone();
        Ok(state)
    }

    /// Apply an event and return the resulting state.
    ///
    /// Issued requests run on the tokio runtime the engine was built in, or
    /// else the caller's. With neither, the request fails at once with
    /// `ServiceUnavailable`.
    ///
    /// Blank feedback comes back as `SessionError::Validation` with the
    /// session unchanged.
    pub fn dispatch(
        &self,
        handle: &SessionHandle,
        event: SessionEvent,
    ) -> Result<SessionState, SessionError> {
        self.dispatch_to(handle.id, event)
    }

    /// Register a listener for state changes.
    ///
    /// Listeners run while the session is locked, so notifications arrive in
    /// transition order. A listener must not dispatch into its own session.
    pub fn subscribe<F>(&self, handle: &SessionHandle, listener: F) -> Result<Subscription, SessionError>
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let slot = self.slot(handle.id)?;
        let listener: Listener = Arc::new(listener);
        let listener_id = {
            let mut guard = lock(&slot);
            guard.next_listener_id += 1;
            let listener_id = guard.next_listener_id;
            guard.listeners.push((listener_id, listener));
            listener_id
        };
        Ok(Subscription {
            slot: Arc::downgrade(&slot),
            listener_id,
        })
    }

    /// Every state change of every session
    pub fn updates(&self) -> broadcast::Receiver<SessionUpdate> {
        self.inner.bus.subscribe()
    }

    fn slot(&self, id: SessionId) -> Result<Arc<Mutex<SessionSlot>>, SessionError> {
        self.inner
            .sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::UnknownSession(id))
    }

    fn dispatch_to(&self, id: SessionId, event: SessionEvent) -> Result<SessionState, SessionError> {
        let slot = self.slot(id)?;
        let credential = self.inner.credentials.get();

        let (state, issue) = {
            let mut guard = lock(&slot);
            let event_name = event.name();
            let transition = guard.session.apply(event, credential)?;
            let state = guard.session.state().clone();

            if transition.changed {
                info!(
                    "🧠 [SESSION] {} {} -> {}",
                    guard.session.target(),
                    event_name,
                    state.label()
                );
                for (_, listener) in &guard.listeners {
                    listener(&state);
                }
                self.inner.bus.publish(SessionUpdate {
                    session_id: id,
                    state: state.clone(),
                });
            }
            (state, transition.issue)
        };

        if let Some(request) = issue {
            self.spawn_request(id, request);
        }
        Ok(state)
    }

    fn spawn_request(&self, id: SessionId, request: state::IssuedRequest) {
        let Some(runtime) = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            warn!("🧠 [SESSION] No async runtime to execute {} for {}", request.token, id);
            let event = SessionEvent::ResponseFailed {
                token: request.token,
                error: AnalysisError::ServiceUnavailable {
                    status: None,
                    message: "no async runtime available".to_string(),
                },
            };
            if let Err(e) = self.dispatch_to(id, event) {
                debug!("🧠 [SESSION] Could not fail {} for {}: {}", request.token, id, e);
            }
            return;
        };
        let engine = self.clone();

        runtime.spawn(async move {
            let IssuedRequest {
                token,
                descriptor,
                credential,
            } = request;

            let outcome = {
                // The semaphore is never closed; an error here only means no limit applies.
                let _permit = engine.inner.limiter.acquire().await;
                debug!("🧠 [SESSION] Executing {} for {}", token, descriptor.target);
                engine
                    .inner
                    .backend
                    .execute(&descriptor, Some(&credential))
                    .await
            };

            let event = match outcome {
                Ok(result) => SessionEvent::ResponseArrived { token, result },
                Err(error) => SessionEvent::ResponseFailed { token, error },
            };

            match engine.dispatch_to(id, event) {
                Ok(_) => {}
                Err(SessionError::UnknownSession(_)) => {
                    debug!("🧠 [SESSION] Reply {} arrived after {} was closed", token, id);
                }
                Err(e) => warn!("🧠 [SESSION] Failed to deliver reply {} to {}: {}", token, id, e),
            }
        });
    }
}
