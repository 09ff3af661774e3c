//! The authenticated principal carried by every access token.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Who is making a request, as established by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: DbId,
    pub username: String,
    pub is_admin: bool,
}
