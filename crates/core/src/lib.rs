//! Domain logic for the satellite-image analysis backend.
//!
//! Everything here is free of database and HTTP concerns so it can be unit
//! tested in isolation and shared by the `db` and `api` crates.

pub mod access;
pub mod detection;
pub mod error;
pub mod features;
pub mod geo;
pub mod identity;
pub mod imagery;
pub mod paging;
pub mod placeholder;
pub mod report;
pub mod status;
pub mod types;
pub mod upload;
pub mod validation;
