use thiserror::Error;

/// Domain error surface shared by both crates.
///
/// Validation errors are raised before any write; command methods run
/// validation, then mutation, then commit. Errors raised mid-transaction
/// abort it.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller input or precondition (unsupported publisher,
    /// malformed repository, non-allowlisted committee, missing committee).
    #[error("{0}")]
    Interaction(String),

    /// Caller lacks the role required for the operation.
    #[error("{0}")]
    Access(String),

    /// No release policy matches a verified workflow path.
    #[error("{0}")]
    ReleasePolicyNotFound(String),

    /// A directory lookup could not map an external identity to an ASF uid.
    #[error("{message}")]
    ApacheUserMissing {
        message: String,
        fingerprint: Option<String>,
        primary_uid: Option<String>,
    },

    /// Signature or key material rejected by the external verifier.
    #[error("{0}")]
    PublicKey(String),

    /// Referenced release, revision, or task absent.
    #[error("{0}")]
    NotFound(String),

    /// Archive, directory, or verifier unavailable or timed out.
    #[error("external service error: {0}")]
    External(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
