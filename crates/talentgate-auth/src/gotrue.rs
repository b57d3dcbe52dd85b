//! HTTP client for a hosted GoTrue-compatible auth service.
//!
//! The client keeps the signed-in session locally and announces every
//! change on its event bus, the way hosted-auth SDKs do: callers sign in
//! through the client, and the session manager learns about it from the
//! resulting `SIGNED_IN` notification.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    AuthError, AuthEvent, AuthEventBus, AuthProvider, AuthSession, AuthSubscription, User,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A stored session this close to expiry is refreshed by
/// `get_current_session` before being returned.
const AUTO_REFRESH_SKEW: chrono::Duration = chrono::Duration::seconds(10);

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Body of every endpoint that issues tokens.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
    /// Newer service versions include the absolute expiry; older ones only
    /// send `expires_in`.
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, issued_at: DateTime<Utc>) -> Result<AuthSession, AuthError> {
        let expires_at = match self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        {
            Some(at) => at,
            None => chrono::Duration::try_seconds(self.expires_in)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    AuthError::Decode(format!("expires_in out of range: {}", self.expires_in))
                })?,
        };
        Ok(AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        })
    }
}

/// The service reports errors in a few shapes depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.trim().to_string()
            }
        })
}

/// Result of a sign-up. `session` is `None` when the service requires the
/// user to confirm their email first.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<AuthSession>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the hosted auth service.
pub struct GoTrueClient {
    http: Client,
    /// Project URL without a trailing slash.
    base_url: String,
    anon_key: String,
    session: Mutex<Option<AuthSession>>,
    events: AuthEventBus,
}

impl GoTrueClient {
    /// Creates a client for the project at `base_url` using its public
    /// (anon) API key.
    ///
    /// # Errors
    /// [`AuthError::Configuration`] if the URL doesn't parse or the key is
    /// empty.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, AuthError> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| AuthError::Configuration(format!("invalid auth URL {trimmed:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthError::Configuration(format!(
                "auth URL must be http(s), got {:?}",
                parsed.scheme()
            )));
        }
        if anon_key.trim().is_empty() {
            return Err(AuthError::Configuration("anon key is empty".into()));
        }

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
            anon_key: anon_key.to_string(),
            session: Mutex::new(None),
            events: AuthEventBus::new(),
        })
    }

    /// Signs in with email and password. Emits `SIGNED_IN`.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let req = self
            .request(reqwest::Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password });
        let tokens: TokenResponse = self.send_json(req).await?;
        let session = tokens.into_session(Utc::now())?;

        tracing::info!(user_id = %session.user.id, "signed in with password");
        self.store(Some(session.clone()));
        self.events.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Creates an account. If the service returns a session straight away
    /// (email confirmation disabled) it is stored and `SIGNED_IN` emitted.
    ///
    /// `email_redirect_to` is where the confirmation link should land.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        email_redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut req = self
            .request(reqwest::Method::POST, "signup")
            .json(&PasswordCredentials { email, password });
        if let Some(redirect) = email_redirect_to {
            req = req.query(&[("redirect_to", redirect)]);
        }
        let body: serde_json::Value = self.send_json(req).await?;

        if body.get("access_token").is_some() {
            let tokens: TokenResponse = serde_json::from_value(body)?;
            let session = tokens.into_session(Utc::now())?;
            tracing::info!(user_id = %session.user.id, "signed up and signed in");
            self.store(Some(session.clone()));
            self.events.emit(AuthEvent::SignedIn(session.clone()));
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: User = serde_json::from_value(body)?;
        tracing::info!(user_id = %user.id, "signed up, awaiting email confirmation");
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    /// URL to send the user to for an OAuth sign-in with `provider`
    /// (`"github"`, `"google"`, ...). The service redirects back to
    /// `redirect_to` with tokens in the fragment.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.base_url),
            &[("provider", provider), ("redirect_to", redirect_to)],
        )
        .map_err(|e| AuthError::Configuration(e.to_string()))
    }

    /// Installs a session obtained elsewhere (an OAuth redirect, a session
    /// persisted by a previous run). Emits `SIGNED_IN`.
    pub fn set_session(&self, session: AuthSession) {
        self.store(Some(session.clone()));
        self.events.emit(AuthEvent::SignedIn(session));
    }

    /// Updates the signed-in user's attributes (`email`, `password`,
    /// `data`). Emits `USER_UPDATED` with the stored session carrying the
    /// new user record.
    pub async fn update_user(&self, attributes: serde_json::Value) -> Result<User, AuthError> {
        let current = self.stored().ok_or(AuthError::NoSession)?;
        let req = self
            .request(reqwest::Method::PUT, "user")
            .header(reqwest::header::AUTHORIZATION, current.bearer())
            .json(&attributes);
        let user: User = self.send_json(req).await?;

        let updated = AuthSession {
            user: user.clone(),
            ..current
        };
        self.store(Some(updated.clone()));
        self.events.emit(AuthEvent::UserUpdated(updated));
        Ok(user)
    }

    /// Signs out. The local session is cleared and `SIGNED_OUT` emitted
    /// even if the service can't be reached; the error is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.stored() {
            Some(current) => {
                let req = self
                    .request(reqwest::Method::POST, "logout")
                    .header(reqwest::header::AUTHORIZATION, current.bearer());
                self.send_empty(req).await
            }
            None => Ok(()),
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "remote sign-out failed, clearing local session anyway");
        }
        self.store(None);
        self.events.emit(AuthEvent::SignedOut);
        result
    }

    // -- helpers ------------------------------------------------------------

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AuthError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), AuthError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    fn stored(&self) -> Option<AuthSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store(&self, session: Option<AuthSession>) {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }
}

impl AuthProvider for GoTrueClient {
    /// Returns the stored session, refreshing it first if it is about to
    /// expire.
    async fn get_current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        match self.stored() {
            Some(session) if session.is_expired_at(Utc::now() + AUTO_REFRESH_SKEW) => {
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let current = self.stored().ok_or(AuthError::NoSession)?;
        let req = self
            .request(reqwest::Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest {
                refresh_token: &current.refresh_token,
            });

        let tokens: TokenResponse = match self.send_json(req).await {
            Ok(tokens) => tokens,
            Err(AuthError::Rejected { status: 400 | 401, message }) => {
                tracing::warn!(%message, "refresh token rejected");
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(e) => return Err(e),
        };

        let session = tokens.into_session(Utc::now())?;
        tracing::debug!(
            user_id = %session.user.id,
            expires_at = %session.expires_at,
            "session refreshed"
        );
        self.store(Some(session.clone()));
        self.events.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    fn user() -> User {
        User {
            id: UserId::from("u-1"),
            email: Some("dev@example.com".into()),
            role: Some("authenticated".into()),
            app_metadata: Default::default(),
        }
    }

    fn session_expiring_in(secs: i64) -> AuthSession {
        AuthSession {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            token_type: "bearer".into(),
            expires_at: Utc::now() + chrono::Duration::seconds(secs),
            user: user(),
        }
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = GoTrueClient::new("not a url", "key");
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_non_http_scheme() {
        let result = GoTrueClient::new("ftp://auth.example.com", "key");
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let result = GoTrueClient::new("https://project.example.com", "  ");
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let client = GoTrueClient::new("https://project.example.com/", "key").unwrap();

        let url = client
            .authorize_url("github", "https://app.example.com/dashboard?tab=jobs")
            .unwrap();

        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("provider".into(), "github".into())));
        assert!(pairs.contains(&(
            "redirect_to".into(),
            "https://app.example.com/dashboard?tab=jobs".into()
        )));
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let json = r#"{
            "access_token": "a", "refresh_token": "r",
            "expires_in": 3600, "expires_at": 1700000000,
            "user": { "id": "u-1" }
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();

        let session = tokens.into_session(Utc::now()).unwrap();

        assert_eq!(session.expires_at.timestamp(), 1_700_000_000);
        assert_eq!(session.token_type, "bearer");
    }

    #[test]
    fn test_token_response_derives_expiry_from_expires_in() {
        let json = r#"{
            "access_token": "a", "refresh_token": "r", "token_type": "bearer",
            "expires_in": 3600, "user": { "id": "u-1" }
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();
        let issued = DateTime::<Utc>::from_timestamp(1_000_000, 0).unwrap();

        let session = tokens.into_session(issued).unwrap();

        assert_eq!(session.expires_at.timestamp(), 1_003_600);
    }

    #[test]
    fn test_into_session_huge_expires_in_returns_decode_error() {
        let json = r#"{
            "access_token": "a", "refresh_token": "r",
            "expires_in": 9223372036854775807, "user": { "id": "u-1" }
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();

        let err = tokens.into_session(Utc::now()).unwrap_err();

        assert!(matches!(err, AuthError::Decode(_)));
    }

    #[test]
    fn test_into_session_expiry_past_calendar_end_returns_decode_error() {
        let json = r#"{
            "access_token": "a", "refresh_token": "r",
            "expires_in": 9000000000000, "user": { "id": "u-1" }
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();

        let err = tokens.into_session(Utc::now()).unwrap_err();

        assert!(matches!(err, AuthError::Decode(_)));
    }

    #[test]
    fn test_error_message_reads_known_shapes() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(
                status,
                r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#
            ),
            "Invalid Refresh Token"
        );
        assert_eq!(
            error_message(status, r#"{"code":400,"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(error_message(status, ""), "Bad Request");
        assert_eq!(error_message(status, "plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_set_session_emits_signed_in_and_stores() {
        let client = GoTrueClient::new("https://project.example.com", "key").unwrap();
        let mut sub = client.subscribe();
        let session = session_expiring_in(3600);

        client.set_session(session.clone());

        assert_eq!(sub.recv().await, Some(AuthEvent::SignedIn(session.clone())));
        let current = client.get_current_session().await.unwrap();
        assert_eq!(current, Some(session));
    }

    #[tokio::test]
    async fn test_refresh_without_session_returns_no_session() {
        let client = GoTrueClient::new("https://project.example.com", "key").unwrap();

        let result = client.refresh_session().await;

        assert_eq!(result, Err(AuthError::NoSession));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_emits_signed_out() {
        let client = GoTrueClient::new("https://project.example.com", "key").unwrap();
        let mut sub = client.subscribe();

        client.sign_out().await.unwrap();

        assert_eq!(sub.recv().await, Some(AuthEvent::SignedOut));
        assert_eq!(client.get_current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_user_without_session_returns_no_session() {
        let client = GoTrueClient::new("https://project.example.com", "key").unwrap();

        let result = client
            .update_user(serde_json::json!({ "data": { "full_name": "Dev" } }))
            .await;

        assert_eq!(result, Err(AuthError::NoSession));
    }
}
