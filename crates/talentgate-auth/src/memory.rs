//! An in-process provider with scripted responses.
//!
//! Useful for tests and offline demos: it holds a "server-side" session,
//! hands out queued refresh results, counts every call, and lets the caller
//! emit arbitrary auth events.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AuthError, AuthEvent, AuthEventBus, AuthProvider, AuthSession, AuthSubscription};

#[derive(Default)]
struct Script {
    current: Option<AuthSession>,
    refresh_results: VecDeque<Result<AuthSession, AuthError>>,
    get_failures: VecDeque<AuthError>,
}

/// Scriptable [`AuthProvider`].
///
/// - `get_current_session` returns the stored session unless a failure was
///   queued with [`fail_next_get`](Self::fail_next_get).
/// - `refresh_session` pops the next queued result. A successful refresh
///   becomes the stored session. With nothing queued it fails with
///   [`AuthError::Network`].
/// - Events are only emitted when the test asks for them.
#[derive(Default)]
pub struct MemoryAuthProvider {
    script: Mutex<Script>,
    events: AuthEventBus,
    get_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `session` already stored, as if the user signed in on a
    /// previous visit.
    pub fn with_session(session: AuthSession) -> Self {
        let provider = Self::default();
        provider.set_current(Some(session));
        provider
    }

    /// Replaces the stored session without emitting anything.
    pub fn set_current(&self, session: Option<AuthSession>) {
        self.lock().current = session;
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.lock().current.clone()
    }

    /// Queues the outcome of the next `refresh_session` call.
    pub fn push_refresh(&self, result: Result<AuthSession, AuthError>) {
        self.lock().refresh_results.push_back(result);
    }

    /// Makes the next `get_current_session` call fail with `err`.
    pub fn fail_next_get(&self, err: AuthError) {
        self.lock().get_failures.push_back(err);
    }

    /// Publishes `event` to subscribers and mirrors it into the stored
    /// session the way a real provider would.
    pub fn emit(&self, event: AuthEvent) {
        {
            let mut script = self.lock();
            match &event {
                AuthEvent::SignedOut => script.current = None,
                other => script.current = other.session().cloned(),
            }
        }
        self.events.emit(event);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test thread can poison the lock; the script data is
        // still usable.
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuthProvider for MemoryAuthProvider {
    async fn get_current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.lock();
        if let Some(err) = script.get_failures.pop_front() {
            return Err(err);
        }
        Ok(script.current.clone())
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.lock();
        let result = script
            .refresh_results
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Network("no scripted refresh result".into())));
        if let Ok(session) = &result {
            script.current = Some(session.clone());
        }
        result
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}
