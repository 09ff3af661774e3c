//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- the caller's [`Identity`](satscan_core::identity::Identity) from a Bearer token.
//! - [`rbac::RequireAdmin`] -- an [`auth::AuthUser`] that must be an administrator.

pub mod auth;
pub mod rbac;
