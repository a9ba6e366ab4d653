//! Platform administrator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Clerk user IDs allowed on `/api/user/admin/*`.
    #[serde(default)]
    pub user_ids: Vec<String>,
}

impl AdminConfig {
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }
}
