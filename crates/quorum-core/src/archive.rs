use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::error::Result;
use crate::types::ArchiveMessage;

/// Lazy, finite, non-restartable sequence of one thread's messages, ordered
/// by archive delivery time. Consumers must tolerate an empty stream.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<ArchiveMessage>> + Send>>;

/// Read-only view of the public mail archive.
///
/// The raw crawler is an external collaborator; implementations yield
/// already-structured message records. Calls carry the caller's deadline;
/// on timeout they fail with the external-unavailable error kind.
#[async_trait]
pub trait MailArchive: Send + Sync {
    /// Stream the messages of a thread in chronological order.
    async fn thread_messages(&self, thread_id: &str) -> Result<MessageStream>;

    /// Resolve a thread to `(list_address, message_id)` of its first message.
    async fn thread_source(&self, thread_id: &str) -> Result<(String, String)>;

    /// Archive URL for a message id, when the archive has seen it.
    async fn archive_url(&self, mid: &str) -> Result<Option<String>>;
}
