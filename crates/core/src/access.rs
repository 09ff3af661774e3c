//! Row-level authorization rules.
//!
//! Every analysis (and everything hanging off it) is visible to its owner
//! and to administrators only. User accounts are visible to the account
//! holder and to administrators.

use crate::error::CoreError;
use crate::identity::Identity;
use crate::types::DbId;

/// Allow the request if `identity` owns the row or is an administrator.
pub fn ensure_owner_or_admin(identity: &Identity, owner_id: DbId) -> Result<(), CoreError> {
    if identity.is_admin || identity.id == owner_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Permission denied".into()))
    }
}

/// Allow the request if `identity` is the target user or an administrator.
pub fn ensure_self_or_admin(identity: &Identity, user_id: DbId) -> Result<(), CoreError> {
    if identity.is_admin || identity.id == user_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Permission denied".into()))
    }
}

/// Allow the request only for administrators.
pub fn ensure_admin(identity: &Identity) -> Result<(), CoreError> {
    if identity.is_admin {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Admin permission required".into()))
    }
}
