//! SDK configuration and URL derivation.

use serde::{Deserialize, Serialize};

/// Default API base (local backend in development).
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

/// Connection settings for one [`Studio`](crate::Studio) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Base URL of the API, e.g. `https://api.example.com/api/v1`.
    pub api_base: String,
    /// Bearer token attached to every request, if the deployment requires auth.
    pub auth_token: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_token: None,
        }
    }
}

impl StudioConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Full URL for a studio-genesis endpoint.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/studio-genesis/{path}", self.api_base.trim_end_matches('/'))
    }

    /// Image upload endpoint (lives outside the studio-genesis prefix).
    pub(crate) fn upload_endpoint(&self) -> String {
        format!("{}/upload/image", self.api_base.trim_end_matches('/'))
    }

    /// Progress channel URL scoped to one task identity.
    ///
    /// Same host and path prefix as the API with the scheme switched to
    /// ws/wss.
    pub fn ws_url(&self, task_id: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https") {
            format!("wss{rest}")
        } else if let Some(rest) = base.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/studio-genesis/ws/{task_id}")
    }
}
