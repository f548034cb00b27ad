//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stream channel record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Opaque channel identifier, externally owned.
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// `None` means the channel has never been probed (unknown status),
    /// distinct from `Some(false)` (confirmed offline).
    pub is_online: Option<bool>,
    pub last_checked: Option<DateTime<Utc>>,
    pub check_error: Option<String>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            is_active: true,
            is_online: None,
            last_checked: None,
            check_error: None,
        }
    }
}
