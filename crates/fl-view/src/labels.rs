//! Display strings the controllers put into rows and dialogs.

use serde::{Deserialize, Serialize};

/// Localizable labels. Missing fields fall back to the English defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Labels {
    /// Name of the user filter
    pub user_filter: String,
    /// Name of the whitelist pseudo-filter
    pub whitelist: String,
    /// Rule column text for requests allowed by the whitelist
    pub in_whitelist: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            user_filter: "User filter".to_string(),
            whitelist: "Whitelist".to_string(),
            in_whitelist: "In whitelist".to_string(),
        }
    }
}
