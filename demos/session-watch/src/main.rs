//! Mounts a session manager against a hosted auth service and prints every
//! snapshot change until Ctrl-C.
//!
//! ```text
//! TALENTGATE_AUTH_URL=https://<project>.example.co \
//! TALENTGATE_ANON_KEY=... \
//! TALENTGATE_EMAIL=dev@example.com TALENTGATE_PASSWORD=... \
//! cargo run -p session-watch
//! ```
//!
//! Without credentials the manager mounts signed out.

use std::sync::Arc;

use talentgate::prelude::*;
use talentgate::telemetry::init_tracing;

fn summary(snapshot: &SessionSnapshot) -> serde_json::Value {
    serde_json::json!({
        "status": snapshot.status,
        "user": snapshot.user.as_ref().and_then(|u| u.email.clone()),
        "expires_at": snapshot.expires_at().map(|at| at.to_rfc3339()),
        "login_at": snapshot.login_at.map(|at| at.to_rfc3339()),
        "last_refresh_at": snapshot.last_refresh_at.map(|at| at.to_rfc3339()),
    })
}

#[tokio::main]
async fn main() -> Result<(), TalentgateError> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let client = Arc::new(GoTrueClient::new(&config.auth_url, &config.anon_key)?);

    let email = std::env::var("TALENTGATE_EMAIL").ok();
    let password = std::env::var("TALENTGATE_PASSWORD").ok();
    if let (Some(email), Some(password)) = (email, password) {
        let session = client.sign_in_with_password(&email, &password).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
    }

    let log = Arc::new(SessionLog::new());
    let handle = SessionManager::builder(client.clone())
        .config(config.session.clone())
        .marker(Arc::new(FileMarker::new(&config.marker_path)))
        .log_sink(log.clone())
        .mount();

    let mut changes = handle.subscribe();
    let settled = handle.settled().await?;
    println!("{}", summary(&settled));
    // Already printed; only later changes should wake the loop.
    changes.borrow_and_update();
    println!("{:?}", require_auth(&settled));
    if settled.status.is_authenticated() {
        println!("admin: {:?}", config.admin.require_admin(&settled));
    }

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                println!("{}", summary(&snapshot));
                // Signed out is terminal for this manager.
                if !snapshot.status.is_authenticated() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.unmount().await;

    let stats = log.stats();
    tracing::info!(total = stats.total, "session log");
    for (kind, count) in &stats.counts {
        println!("{kind}: {count}");
    }
    Ok(())
}
