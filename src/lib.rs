//! # Authgate (Authentication Decision Core)
//!
//! `authgate` decides whether an authentication transaction is accepted once an
//! external validation pipeline has recorded the outcome of every submitted
//! credential, and lets an IP reputation signal veto the attempt up front.
//!
//! ## Transaction Records
//!
//! A [`TransactionRecord`](authn::TransactionRecord) holds the submitted credentials in
//! submission order plus one success or failure per credential. It is built per
//! attempt and dropped after the verdict.
//!
//! ## Policies
//!
//! Policies (`any`, `all`, `not-prevented`, `required-handler`) are pure functions of a
//! record. The [`PolicyComposer`](authn::PolicyComposer) combines them with
//! `require-all` or `require-any` semantics. A failing policy aborts composition;
//! it never passes silently.
//!
//! ## Risk Gating
//!
//! The [`RiskGate`](risk::RiskGate) asks a reputation source whether the originating
//! address is listed. Lookups are bounded by a timeout and never retried; transport
//! failures become `unknown`, never `banned`.
//!
//! ## Decisions
//!
//! The [`DecisionOrchestrator`](decision::DecisionOrchestrator) runs the gate and the
//! composer in order and always ends in exactly one `accepted` or `rejected` verdict.

pub mod authn;
pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod notify;
pub mod risk;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
