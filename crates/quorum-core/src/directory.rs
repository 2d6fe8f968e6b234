use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Directory service lookups (LDAP or equivalent).
///
/// The snapshot is loaded per tabulation; concurrent tabulations never share
/// in-memory state.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Lowercase address → foundation uid snapshot.
    async fn email_to_uid_map(&self) -> Result<HashMap<String, String>>;

    /// Map an external platform actor id to a foundation uid, when bound.
    async fn github_to_apache(&self, actor_id: &str) -> Result<Option<String>>;
}
