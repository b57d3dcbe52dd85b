//! The session manager actor.
//!
//! One Tokio task owns the session state and is the only thing that ever
//! changes it. It multiplexes four inputs in a single `select!` loop:
//!
//! ```text
//! auth events ──┐
//! refresh deadline ─┤
//! keep-alive tick ──┼──→ SessionActor ──→ watch::Sender<SessionSnapshot>
//! handle commands ──┘          │
//!                              └──→ LogSink, SessionMarker
//! ```
//!
//! Handlers run one at a time, so a refresh can never interleave with a
//! sign-out. Unmounting aborts the task, which drops both timers and the
//! event subscription together with any in-flight request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use talentgate_auth::{AuthError, AuthEvent, AuthProvider, AuthSession, AuthSubscription, UserId};
use talentgate_timer::{KeepAliveTicker, RefreshDeadline, RetryBackoff};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::log::{LogEntry, LogKind, LogSink, SessionLog};
use crate::marker::{MemoryMarker, SessionMarker};
use crate::policy::refresh_delay;
use crate::{ActivityTracker, Clock, SessionConfig, SessionError, SessionSnapshot, SessionStatus};

const COMMAND_CHANNEL_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Entry point for mounting a session manager.
///
/// ```ignore
/// let handle = SessionManager::builder(provider)
///     .config(SessionConfig::default())
///     .marker(Arc::new(FileMarker::new(path)))
///     .mount();
/// ```
pub struct SessionManager;

impl SessionManager {
    pub fn builder<P: AuthProvider>(provider: Arc<P>) -> SessionManagerBuilder<P> {
        SessionManagerBuilder {
            provider,
            config: SessionConfig::default(),
            marker: Arc::new(MemoryMarker::new()),
            log: Arc::new(SessionLog::new()),
            clock: None,
        }
    }
}

/// Configures a manager before it is mounted.
pub struct SessionManagerBuilder<P: AuthProvider> {
    provider: Arc<P>,
    config: SessionConfig,
    marker: Arc<dyn SessionMarker>,
    log: Arc<dyn LogSink>,
    clock: Option<Clock>,
}

impl<P: AuthProvider> SessionManagerBuilder<P> {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Where the advisory marker is written. Defaults to process memory.
    pub fn marker(mut self, marker: Arc<dyn SessionMarker>) -> Self {
        self.marker = marker;
        self
    }

    /// Receiver for diagnostic entries. Defaults to a private [`SessionLog`].
    pub fn log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Time source for recorded timestamps.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Subscribes to auth events and starts the actor.
    ///
    /// Must be called from within a Tokio runtime. The returned handle owns
    /// the task: dropping it unmounts the manager.
    pub fn mount(self) -> SessionHandle {
        let config = self.config.validated();
        let clock = self.clock.unwrap_or_default();
        let activity = ActivityTracker::new(clock);

        // Subscribe before the initial fetch so an event emitted in between
        // is queued rather than lost.
        let events = self.provider.subscribe();

        let (state_tx, state_rx) = watch::channel(SessionSnapshot::loading(clock.now()));
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let actor = SessionActor {
            provider: self.provider,
            marker: self.marker,
            log: self.log,
            clock,
            activity: activity.clone(),
            state: state_tx,
            snapshot: SessionSnapshot::loading(clock.now()),
            refresh: RefreshDeadline::new(),
            keep_alive: KeepAliveTicker::new(config.keep_alive_interval),
            retry: config.retry.backoff(),
            events: Some(events),
            commands: cmd_rx,
            config,
        };

        let task = tokio::spawn(actor.run());

        SessionHandle {
            state: state_rx,
            activity,
            commands: cmd_tx,
            task: Some(task),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

pub(crate) enum SessionCommand {
    /// Refresh immediately, regardless of the schedule.
    RefreshNow {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
}

/// Owner's handle to a mounted manager.
///
/// Reads never wait on the actor: they come from the latest published
/// snapshot. Consumers that need change notifications take a
/// [`subscribe`](Self::subscribe) receiver.
pub struct SessionHandle {
    state: watch::Receiver<SessionSnapshot>,
    activity: ActivityTracker,
    commands: mpsc::Sender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// The current snapshot, with the live activity timestamp.
    pub fn get_session_state(&self) -> SessionSnapshot {
        let mut snapshot = self.state.borrow().clone();
        snapshot.last_activity_at = self.activity.last_activity_at();
        snapshot
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// A receiver notified on every status, user or session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Waits until the initial fetch has resolved.
    pub async fn settled(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| s.status.is_settled())
            .await
            .map_err(|_| SessionError::Unmounted)?;
        Ok(snapshot.clone())
    }

    pub fn record_activity(&self) {
        self.activity.record();
    }

    /// A tracker to hand to input handlers.
    pub fn activity_tracker(&self) -> ActivityTracker {
        self.activity.clone()
    }

    /// Refreshes the token now, e.g. after a request came back 401.
    ///
    /// Returns the snapshot after a successful refresh. A failed refresh is
    /// also logged and retried like a scheduled one.
    pub async fn refresh_now(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::RefreshNow { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unmounted)?;
        reply_rx.await.map_err(|_| SessionError::Unmounted)?
    }

    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the manager.
    ///
    /// When this returns the actor is gone: no timer fires, no request is
    /// made and no snapshot is published after it.
    pub async fn unmount(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            tracing::info!("session manager unmounted");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct SessionActor<P: AuthProvider> {
    provider: Arc<P>,
    config: SessionConfig,
    marker: Arc<dyn SessionMarker>,
    log: Arc<dyn LogSink>,
    clock: Clock,
    activity: ActivityTracker,
    state: watch::Sender<SessionSnapshot>,
    /// Authoritative copy; `state` carries published clones of it.
    snapshot: SessionSnapshot,
    refresh: RefreshDeadline,
    keep_alive: KeepAliveTicker,
    retry: RetryBackoff,
    /// `None` once the provider closed the event stream.
    events: Option<AuthSubscription>,
    commands: mpsc::Receiver<SessionCommand>,
}

impl<P: AuthProvider> SessionActor<P> {
    async fn run(mut self) {
        tracing::info!(
            keep_alive_ms = u64::try_from(self.keep_alive.period().as_millis()).unwrap_or(u64::MAX),
            keep_alive_disabled = self.keep_alive.is_disabled(),
            "session manager mounted"
        );

        self.load_initial_session().await;

        loop {
            tokio::select! {
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_auth_event(event),
                    None => {
                        tracing::warn!("auth event stream closed");
                        self.events = None;
                    }
                },
                _ = self.refresh.fired() => {
                    let _ = self.refresh_session().await;
                }
                _ = self.keep_alive.tick() => self.keep_alive_check().await,
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::RefreshNow { reply }) => {
                        let result = self.refresh_session().await;
                        let _ = reply.send(result.map(|()| self.published()));
                    }
                    None => break,
                },
            }
        }

        self.refresh.cancel();
        self.keep_alive.pause();
        tracing::info!(keep_alive_ticks = self.keep_alive.ticks(), "session manager stopped");
    }

    // -- initialization ----------------------------------------------------

    async fn load_initial_session(&mut self) {
        match self.provider.get_current_session().await {
            Ok(Some(session)) => {
                let expires_at = session.expires_at;
                self.authenticate(session, false);
                self.record(LogKind::SessionLoaded, json!({ "expires_at": expires_at.timestamp() }));
            }
            Ok(None) => {
                self.sign_out();
                self.record(LogKind::SessionMissing, json!({}));
            }
            Err(e) => {
                tracing::warn!(error = %e, "initial session fetch failed");
                self.record(LogKind::ErrorSessionLoad, json!({ "message": e.to_string() }));
                self.sign_out();
            }
        }
        tracing::info!(status = %self.snapshot.status, "initial session resolved");
    }

    // -- auth events -------------------------------------------------------

    fn handle_auth_event(&mut self, event: AuthEvent) {
        let kind = match &event {
            AuthEvent::SignedOut => {
                if self.sign_out() {
                    self.record(LogKind::SignedOut, json!({}));
                }
                return;
            }
            AuthEvent::PasswordRecovery(_) => {
                tracing::debug!("password recovery event ignored");
                return;
            }
            AuthEvent::SignedIn(_) => LogKind::SignedIn,
            AuthEvent::TokenRefreshed(_) => LogKind::TokenRefreshed,
            AuthEvent::UserUpdated(_) => LogKind::UserUpdated,
        };

        if !self.snapshot.status.can_transition_to(SessionStatus::Authenticated) {
            tracing::warn!(
                event = event.kind(),
                status = %self.snapshot.status,
                "auth event ignored in current status"
            );
            let event_user = event.session().map(|s| s.user.id.to_string());
            self.record(
                LogKind::IgnoredEvent,
                json!({ "event": event.kind(), "status": self.snapshot.status, "event_user_id": event_user }),
            );
            return;
        }

        let Some(session) = event.session().cloned() else {
            return;
        };
        let expires_at = session.expires_at;
        self.authenticate(session, kind == LogKind::TokenRefreshed);
        self.record(kind, json!({ "expires_at": expires_at.timestamp() }));
    }

    // -- refresh -----------------------------------------------------------

    async fn refresh_session(&mut self) -> Result<(), SessionError> {
        if !self.snapshot.status.is_authenticated() {
            tracing::debug!(status = %self.snapshot.status, "refresh skipped");
            return Err(SessionError::NotAuthenticated);
        }

        match self.provider.refresh_session().await {
            Ok(session) => {
                let expires_at = session.expires_at;
                self.authenticate(session, true);
                self.record(LogKind::TokenRefreshed, json!({ "expires_at": expires_at.timestamp() }));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                self.record(LogKind::ErrorRefresh, json!({ "message": e.to_string() }));
                self.schedule_retry(&e);
                Err(e.into())
            }
        }
    }

    fn schedule_retry(&mut self, error: &AuthError) {
        if !error.is_retryable() {
            return;
        }
        let Some(delay) = self.retry.next_delay() else {
            tracing::debug!(attempts = self.retry.attempts(), "no refresh retries left");
            return;
        };
        self.refresh.arm_after(delay);
        self.record(
            LogKind::RefreshRetryScheduled,
            json!({ "attempt": self.retry.attempts(), "delay_ms": delay.as_millis() as u64 }),
        );
    }

    fn schedule_refresh(&mut self, expires_at: DateTime<Utc>) {
        let delay = refresh_delay(
            expires_at,
            self.clock.now(),
            self.config.refresh_margin,
            self.config.min_refresh_delay,
        );
        self.refresh.arm_after(delay);
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            %expires_at,
            "token refresh scheduled"
        );
    }

    // -- keep-alive --------------------------------------------------------

    async fn keep_alive_check(&mut self) {
        if !self.snapshot.status.is_authenticated() {
            return;
        }
        if !self.activity.is_active_within(self.config.active_window) {
            tracing::trace!(
                idle_ms = self.activity.idle_for().as_millis() as u64,
                "user idle, keep-alive skipped"
            );
            return;
        }

        match self.provider.get_current_session().await {
            Ok(current) => {
                let server_expiry = current.as_ref().map(|s| s.expires_at);
                if let Some(session) = current {
                    if Some(session.expires_at) != self.snapshot.expires_at() {
                        let expires_at = session.expires_at;
                        self.snapshot.user = Some(session.user.clone());
                        self.snapshot.session = Some(session);
                        self.publish();
                        self.schedule_refresh(expires_at);
                    }
                }
                self.mark_active();
                self.record(
                    LogKind::KeepAlive,
                    json!({ "expires_at": server_expiry.map(|at| at.timestamp()) }),
                );
            }
            Err(e) => {
                self.record(LogKind::ErrorKeepAlive, json!({ "message": e.to_string() }));
            }
        }
    }

    // -- state changes -----------------------------------------------------

    /// Moves to (or stays in) `Authenticated` with `session` and reschedules
    /// the refresh from its expiry.
    fn authenticate(&mut self, session: AuthSession, refreshed: bool) {
        if !self.transition(SessionStatus::Authenticated) {
            return;
        }
        let now = self.clock.now();
        let expires_at = session.expires_at;

        self.snapshot.login_at.get_or_insert(now);
        if refreshed {
            self.snapshot.last_refresh_at = Some(now);
        }
        self.snapshot.user = Some(session.user.clone());
        self.snapshot.session = Some(session);
        self.retry.reset();
        self.publish();

        self.mark_active();
        self.schedule_refresh(expires_at);
    }

    /// Moves to `Unauthenticated`. Returns `false` if already there.
    fn sign_out(&mut self) -> bool {
        if !self.transition(SessionStatus::Unauthenticated) {
            return false;
        }
        self.refresh.cancel();
        self.retry.reset();
        self.snapshot.session = None;
        self.snapshot.user = None;
        self.snapshot.login_at = None;
        self.snapshot.last_refresh_at = None;
        self.publish();

        if let Err(e) = self.marker.clear() {
            self.record(LogKind::ErrorMarker, json!({ "message": e.to_string() }));
        }
        true
    }

    fn transition(&mut self, target: SessionStatus) -> bool {
        let from = self.snapshot.status;
        if !from.can_transition_to(target) {
            tracing::debug!(%from, to = %target, "status transition rejected");
            return false;
        }
        if from != target {
            tracing::info!(%from, to = %target, "session status changed");
        }
        self.snapshot.status = target;
        true
    }

    fn mark_active(&self) {
        if let Err(e) = self.marker.set_active(self.clock.now(), self.config.marker_ttl) {
            self.record(LogKind::ErrorMarker, json!({ "message": e.to_string() }));
        }
    }

    fn publish(&mut self) {
        self.snapshot.last_activity_at = self.activity.last_activity_at();
        self.state.send_replace(self.snapshot.clone());
    }

    fn published(&self) -> SessionSnapshot {
        let mut snapshot = self.snapshot.clone();
        snapshot.last_activity_at = self.activity.last_activity_at();
        snapshot
    }

    fn record(&self, kind: LogKind, details: serde_json::Value) {
        self.log.record(LogEntry {
            kind,
            at: self.clock.now(),
            user_id: self.current_user_id(),
            details,
        });
    }

    fn current_user_id(&self) -> Option<UserId> {
        self.snapshot.user_id().cloned()
    }
}

/// Next auth event; pends forever once the stream has closed.
async fn next_event(events: &mut Option<AuthSubscription>) -> Option<AuthEvent> {
    match events {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
