//! The transaction admission pipeline.
//!
//! Every candidate transaction traverses a fixed chain of decorators before
//! it may touch state: transient per-block rate limiting, structural checks,
//! fee and signature handling, VEID identity gating and the MFA gate for
//! sensitive message types. The first failing decorator short-circuits the
//! chain with a typed error; nothing persistent is mutated on rejection.

pub mod chain;
pub mod config;
pub mod context;
pub mod counter_store;
pub mod errors;
pub mod identity_decorator;
pub mod keepers;
pub mod metrics;
pub mod mfa_decorator;
pub mod rate_limit_decorator;
pub mod standard_decorators;

#[cfg(any(feature = "testing", test))]
pub mod test_utils;
