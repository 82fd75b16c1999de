//! Transaction records and the policies that judge them.

pub mod composer;
pub mod policy;
pub mod record;

pub use composer::{CompositeResult, CompositionMode, PolicyComposer};
pub use policy::{Policy, PolicyResult, PolicySpec};
pub use record::{
    AuthenticationFailure, AuthenticationSuccess, Credential, FailureCause, TransactionRecord,
};
