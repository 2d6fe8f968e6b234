use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Claims extracted from a verified CI provider token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcClaims {
    pub actor_id: String,
    /// `owner/name`, e.g. `apache/tooling-releases`.
    pub repository: String,
    /// `<repository>/<workflow_path>@<git_ref>`.
    pub workflow_ref: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// External validation of signed automation tokens.
///
/// Signature and standard-claim checks happen inside the implementation;
/// key-material failures surface as the public-key error kind.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_github_oidc(&self, jwt: &str) -> Result<OidcClaims>;
}
