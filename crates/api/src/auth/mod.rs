//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- stateless access tokens carrying the caller's [`Identity`](satscan_core::identity::Identity).

pub mod jwt;
pub mod password;
