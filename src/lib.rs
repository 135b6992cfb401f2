//! Purpose: Client library for token-authenticated gateway calls and registry-based service resolution.
//! Exports: `api` (dispatcher, session monitor, resolver, routes), `notice`, `observability`.
//! Role: Blocking client used by applications that talk to services behind the gateway.
//! Invariants: Failures are always returned to the caller, even when a notice was shown.
//! Invariants: No hidden globals; shared state lives in explicitly constructed components.
pub mod api;
pub mod core;
pub mod notice;
pub mod observability;
