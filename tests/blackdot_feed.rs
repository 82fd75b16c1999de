//! End-to-end checks of the risk gate and the decision pipeline against a local
//! BlackDot-compatible feed served on an ephemeral port.

use anyhow::Result;
use authgate::authn::{
    AuthenticationFailure, AuthenticationSuccess, CompositionMode, Credential, FailureCause,
    PolicySpec, TransactionRecord,
};
use authgate::config::{AuthConfig, BlackDotConfig, DecisionConfig, RiskConfig};
use authgate::decision::{DecisionOrchestrator, RejectionReason};
use authgate::notify::Communications;
use authgate::risk::{RiskGate, RiskStatus, VerdictSource};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

const BANNED: &str = "37.58.59.181";
const CLEAN: &str = "8.8.8.8";
const CONTACT: &str = "cas@apereo.org";

#[derive(Clone, Default)]
struct Feed {
    hits: Arc<AtomicUsize>,
}

fn answer(result: &str) -> Json<serde_json::Value> {
    Json(json!({"status": "success", "result": result, "queryIP": ""}))
}

async fn check(State(feed): State<Feed>, Query(params): Query<HashMap<String, String>>) -> Response {
    feed.hits.fetch_add(1, Ordering::SeqCst);

    if params.get("contact").map(String::as_str) != Some(CONTACT)
        || params.get("format").map(String::as_str) != Some("json")
    {
        return Json(json!({"status": "error", "result": "-1", "message": "Invalid contact"}))
            .into_response();
    }

    match params.get("ip").map(String::as_str) {
        Some(BANNED) => answer("1").into_response(),
        Some("203.0.113.50") => answer("0.995").into_response(),
        Some(_) => answer("0").into_response(),
        None => Json(json!({"status": "error", "result": "-2", "message": "Invalid IP"}))
            .into_response(),
    }
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(10)).await;
    answer("1")
}

async fn failing() -> Json<serde_json::Value> {
    Json(json!({"status": "error", "result": "-5", "message": "Your connecting IP is banned"}))
}

async fn down() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn spawn_feed() -> Result<(SocketAddr, Feed)> {
    let feed = Feed::default();
    let app = Router::new()
        .route("/check.php", get(check))
        .route("/slow", get(slow))
        .route("/failing", get(failing))
        .route("/down", get(down))
        .with_state(feed.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            eprintln!("feed stopped: {err}");
        }
    });

    Ok((addr, feed))
}

fn risk_config(addr: SocketAddr, path: &str, timeout_ms: u64) -> RiskConfig {
    let mut blackdot = BlackDotConfig::new(SecretString::from(CONTACT.to_string()));
    blackdot.url = format!("http://{addr}{path}");
    RiskConfig {
        timeout_ms,
        blackdot: Some(blackdot),
        ..RiskConfig::default()
    }
}

fn attempt(origin: &str) -> Result<TransactionRecord> {
    let password = Credential::new("password");
    let otp = Credential::new("otp");
    let mut record = TransactionRecord::new(origin, vec![password.clone(), otp.clone()])?;
    record.add_success(&password, AuthenticationSuccess::new("casuser", "ldap"))?;
    record.add_failure(
        &otp,
        AuthenticationFailure::new("totp", FailureCause::InvalidCredential),
    )?;
    Ok(record)
}

#[tokio::test]
async fn feed_bans_listed_address() -> Result<()> {
    let (addr, _) = spawn_feed().await?;
    let gate = RiskGate::from_config(&risk_config(addr, "/check.php", 2_000))?;

    let verdict = gate.examine(BANNED).await?;
    assert_eq!(verdict.status, RiskStatus::Banned);
    assert_eq!(verdict.source, VerdictSource::Feed);
    assert_eq!(verdict.score, Some(1.0));

    let verdict = gate.examine(CLEAN).await?;
    assert_eq!(verdict.status, RiskStatus::Allowed);
    Ok(())
}

#[tokio::test]
async fn ban_threshold_applies_to_probabilities() -> Result<()> {
    let (addr, _) = spawn_feed().await?;

    let lenient = RiskGate::from_config(&risk_config(addr, "/check.php", 2_000))?;
    assert!(lenient.examine("203.0.113.50").await?.is_allowed());

    let mut config = risk_config(addr, "/check.php", 2_000);
    if let Some(blackdot) = config.blackdot.as_mut() {
        blackdot.ban_threshold = 0.99;
    }
    let strict = RiskGate::from_config(&config)?;
    assert!(strict.examine("203.0.113.50").await?.is_banned());
    Ok(())
}

#[tokio::test]
async fn service_errors_are_unknown() -> Result<()> {
    let (addr, _) = spawn_feed().await?;

    for path in ["/failing", "/down", "/missing"] {
        let gate = RiskGate::from_config(&risk_config(addr, path, 2_000))?;
        let verdict = gate.examine(BANNED).await?;
        assert_eq!(verdict.status, RiskStatus::Unknown, "{path}");
        assert_eq!(verdict.source, VerdictSource::Unavailable, "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn slow_feed_is_bounded_by_timeout() -> Result<()> {
    let (addr, _) = spawn_feed().await?;
    let gate = RiskGate::from_config(&risk_config(addr, "/slow", 200))?;

    let started = Instant::now();
    let verdict = gate.examine(BANNED).await?;
    let elapsed = started.elapsed();

    assert!(verdict.is_unknown());
    assert!(elapsed < Duration::from_millis(1_500), "took {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn unreachable_feed_is_unknown() -> Result<()> {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let gate = RiskGate::from_config(&risk_config(addr, "/check.php", 1_000))?;
    assert!(gate.examine(BANNED).await?.is_unknown());
    Ok(())
}

#[tokio::test]
async fn malformed_address_never_reaches_the_feed() -> Result<()> {
    let (addr, feed) = spawn_feed().await?;
    let gate = RiskGate::from_config(&risk_config(addr, "/check.php", 1_000))?;

    assert!(gate.examine("999.1.1.1").await.is_err());
    assert_eq!(feed.hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn cached_verdicts_skip_the_feed() -> Result<()> {
    let (addr, feed) = spawn_feed().await?;
    let config = RiskConfig {
        cache_ttl_seconds: 60,
        ..risk_config(addr, "/check.php", 2_000)
    };
    let gate = RiskGate::from_config(&config)?;

    assert_eq!(gate.examine(BANNED).await?.source, VerdictSource::Feed);
    assert_eq!(gate.examine(BANNED).await?.source, VerdictSource::Cache);
    assert_eq!(feed.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

fn decision_config(risk: RiskConfig) -> DecisionConfig {
    DecisionConfig {
        auth: AuthConfig {
            composition: CompositionMode::RequireAll,
            policies: vec![
                PolicySpec::Any { try_all: false },
                PolicySpec::NotPrevented {
                    try_all: false,
                    disqualifying: None,
                },
            ],
            require_policy: true,
        },
        risk,
        alert: None,
    }
}

#[tokio::test]
async fn banned_origin_is_rejected_end_to_end() -> Result<()> {
    let (addr, _) = spawn_feed().await?;
    let orchestrator = DecisionOrchestrator::from_config(
        &decision_config(risk_config(addr, "/check.php", 2_000)),
        Communications::new(),
    )?;

    let decision = orchestrator.decide(&attempt(BANNED)?).await;
    assert_eq!(decision.rejection(), Some(RejectionReason::RiskBanned));
    assert!(decision.policies.is_empty());

    let decision = orchestrator.decide(&attempt(CLEAN)?).await;
    assert!(decision.is_accepted());
    assert_eq!(decision.policies.len(), 2);
    Ok(())
}

#[tokio::test]
async fn monitor_only_gate_lets_banned_origin_through() -> Result<()> {
    let (addr, _) = spawn_feed().await?;
    let risk = RiskConfig {
        enforcing: false,
        ..risk_config(addr, "/check.php", 2_000)
    };
    let orchestrator =
        DecisionOrchestrator::from_config(&decision_config(risk), Communications::new())?;

    let decision = orchestrator.decide(&attempt(BANNED)?).await;
    assert!(decision.is_accepted());
    assert_eq!(decision.risk.map(|v| v.status), Some(RiskStatus::Banned));
    Ok(())
}

#[tokio::test]
async fn slow_feed_does_not_block_the_decision() -> Result<()> {
    let (addr, _) = spawn_feed().await?;
    let orchestrator = DecisionOrchestrator::from_config(
        &decision_config(risk_config(addr, "/slow", 200)),
        Communications::new(),
    )?;

    let started = Instant::now();
    let decision = orchestrator.decide(&attempt(BANNED)?).await;
    assert!(decision.is_accepted());
    assert_eq!(
        decision.risk.map(|v| v.source),
        Some(VerdictSource::Unavailable)
    );
    assert!(started.elapsed() < Duration::from_millis(1_500));
    Ok(())
}
