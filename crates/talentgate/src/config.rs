//! Application configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use talentgate_session::{AdminPolicy, SessionConfig};

pub const DEFAULT_MARKER_PATH: &str = "talentgate-session.json";

/// Errors building [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Everything a client binary needs to mount the session manager.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth_url: String,
    pub anon_key: String,
    pub marker_path: PathBuf,
    pub session: SessionConfig,
    pub admin: AdminPolicy,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// Required:
    /// - `TALENTGATE_AUTH_URL`: project URL of the hosted auth service (without `/auth/v1`)
    /// - `TALENTGATE_ANON_KEY`: public API key sent with every request
    ///
    /// Optional:
    /// - `TALENTGATE_MARKER_PATH`: default `talentgate-session.json`
    /// - `TALENTGATE_REFRESH_MARGIN_SECS`, `TALENTGATE_MIN_REFRESH_DELAY_SECS`,
    ///   `TALENTGATE_KEEP_ALIVE_SECS` (0 disables), `TALENTGATE_ACTIVE_WINDOW_SECS`,
    ///   `TALENTGATE_MARKER_TTL_SECS`, `TALENTGATE_REFRESH_RETRIES`
    /// - `TALENTGATE_ADMIN_ALLOWLIST` (comma-separated), `TALENTGATE_ADMIN_DOMAIN`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let auth_url = env.required("TALENTGATE_AUTH_URL")?;
        let anon_key = env.required("TALENTGATE_ANON_KEY")?;
        let marker_path = env
            .optional("TALENTGATE_MARKER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKER_PATH));

        let defaults = SessionConfig::default();
        let mut session = SessionConfig {
            refresh_margin: env.secs("TALENTGATE_REFRESH_MARGIN_SECS", defaults.refresh_margin)?,
            min_refresh_delay: env
                .secs("TALENTGATE_MIN_REFRESH_DELAY_SECS", defaults.min_refresh_delay)?,
            keep_alive_interval: env.secs("TALENTGATE_KEEP_ALIVE_SECS", defaults.keep_alive_interval)?,
            active_window: env.secs("TALENTGATE_ACTIVE_WINDOW_SECS", defaults.active_window)?,
            marker_ttl: env.secs("TALENTGATE_MARKER_TTL_SECS", defaults.marker_ttl)?,
            retry: defaults.retry,
        };
        if let Some(retries) = env.parse::<u32>("TALENTGATE_REFRESH_RETRIES")? {
            session.retry.max_attempts = retries;
        }

        let admin = AdminPolicy::new(
            &env.optional("TALENTGATE_ADMIN_ALLOWLIST").unwrap_or_default(),
            &env.optional("TALENTGATE_ADMIN_DOMAIN").unwrap_or_default(),
        );

        Ok(Self {
            auth_url: auth_url.trim_end_matches('/').to_string(),
            anon_key,
            marker_path,
            session: session.validated(),
            admin,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// The trimmed value, with blank treated as unset.
    fn optional(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing(var))
    }

    fn parse<T: std::str::FromStr>(&self, var: &'static str) -> Result<Option<T>, ConfigError> {
        self.optional(var)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| ConfigError::Invalid { var, value: raw })
            })
            .transpose()
    }

    fn secs(&self, var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(self
            .parse::<u64>(var)?
            .map(Duration::from_secs)
            .unwrap_or(default))
    }
}
