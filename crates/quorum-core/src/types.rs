use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mail domain of the foundation; a `local@apache.org` sender is its own uid.
pub const FOUNDATION_MAIL_DOMAIN: &str = "apache.org";

/// Base URL of the public mail archive, thread id appended.
pub const ARCHIVE_THREAD_URL: &str = "https://lists.apache.org/thread/";

/// Sentinel stored in `Task::revision_number` meaning "the latest revision".
pub const LATEST_REVISION_NUMBER: &str = "latest";

/// Canonical release key: `<project>-<version>`.
pub fn release_name(project_name: &str, version: &str) -> String {
    format!("{project_name}-{version}")
}

// ── Phase / status enums ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePhase {
    CandidateDraft,
    Candidate,
    Preview,
    Release,
}

impl ReleasePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CandidateDraft => "candidate_draft",
            Self::Candidate => "candidate",
            Self::Preview => "preview",
            Self::Release => "release",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "candidate_draft" => Some(Self::CandidateDraft),
            "candidate" => Some(Self::Candidate),
            "preview" => Some(Self::Preview),
            "release" => Some(Self::Release),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    VoteInitiate,
    MessageSend,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VoteInitiate => "vote_initiate",
            Self::MessageSend => "message_send",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vote_initiate" => Some(Self::VoteInitiate),
            "message_send" => Some(Self::MessageSend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    Warning,
    Failure,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

// ── Entities ─────────────────────────────────────────────────────────────

/// A top-level project, optionally bound to a committee and a release policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    pub short_display_name: String,
    /// May be absent transiently during project setup; any operation that
    /// needs a committee fails with a committee-missing error.
    pub committee_name: Option<String>,
}

/// A project management committee (or podling PPMC) with its role sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Committee {
    pub name: String,
    pub full_name: String,
    pub display_name: String,
    pub is_podling: bool,
    pub members: Vec<String>,
    pub committers: Vec<String>,
    pub participants: Vec<String>,
}

impl Committee {
    pub fn is_member(&self, asf_uid: &str) -> bool {
        self.members.iter().any(|m| m == asf_uid)
    }

    pub fn is_committer(&self, asf_uid: &str) -> bool {
        self.committers.iter().any(|c| c == asf_uid)
    }
}

/// Per-project release policy: vote duration floor and the workflow-path
/// allowlists consulted by the trusted-automation verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePolicy {
    pub project_name: String,
    /// Minimum vote duration in hours; `None` or 0 means no minimum.
    pub min_hours: Option<i64>,
    pub github_repository_name: Option<String>,
    pub compose_workflow_paths: Vec<String>,
    pub vote_workflow_paths: Vec<String>,
    pub finish_workflow_paths: Vec<String>,
}

/// A release of a project, keyed by `release_name(project, version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub project_name: String,
    pub version: String,
    pub phase: ReleasePhase,
    /// References the revision with maximal `seq`, when any exists.
    pub latest_revision_number: Option<String>,
    /// Set exactly once per two-round podling sequence; presence means the
    /// release is in round 2.
    pub podling_thread_id: Option<String>,
    pub created: DateTime<Utc>,
}

/// A snapshot of a release's artifact set; `seq` defines total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub release_name: String,
    pub number: String,
    pub seq: i64,
    pub asfuid: String,
    pub created: DateTime<Utc>,
    pub description: String,
}

/// One row of the external checker's results for a release revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub release_name: String,
    pub revision_number: String,
    pub checker: String,
    pub status: CheckStatus,
}

// ── Task queue ───────────────────────────────────────────────────────────

/// Payload of a `VOTE_INITIATE` task, consumed by the vote-initiate worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInitiateArgs {
    pub release_name: String,
    pub email_to: String,
    /// Advisory duration in hours chosen on the start form.
    pub vote_duration: i64,
    pub initiator_id: String,
    pub initiator_fullname: String,
    pub subject: String,
    pub body: String,
}

/// Payload of a `MESSAGE_SEND` task, consumed by the message-send worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSendArgs {
    pub email_sender: String,
    pub email_recipient: String,
    pub subject: String,
    pub body: String,
    pub in_reply_to: String,
}

/// Shape-polymorphic task arguments; the serde tag doubles as the
/// `task_type` discriminator column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskArgs {
    VoteInitiate(VoteInitiateArgs),
    MessageSend(MessageSendArgs),
}

impl TaskArgs {
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::VoteInitiate(_) => TaskType::VoteInitiate,
            Self::MessageSend(_) => TaskType::MessageSend,
        }
    }
}

/// Result recorded by the vote-initiate worker once the message archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInitiateResult {
    /// Archive message id of the [VOTE] mail.
    pub mid: String,
    pub archive_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskResult {
    VoteInitiate(VoteInitiateResult),
}

/// A queued unit of work as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub args: TaskArgs,
    pub result: Option<TaskResult>,
    pub added: DateTime<Utc>,
    pub project_name: String,
    pub version_name: String,
    /// May be the [`LATEST_REVISION_NUMBER`] sentinel.
    pub revision_number: Option<String>,
    pub asf_uid: String,
}

/// Fields of a task to be queued; `task_type` and `added` are derived.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub status: TaskStatus,
    pub args: TaskArgs,
    pub project_name: String,
    pub version_name: String,
    pub revision_number: Option<String>,
    pub asf_uid: String,
}

// ── Archive records ──────────────────────────────────────────────────────

/// One already-structured message from the mail archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveMessage {
    /// Archive message id.
    pub mid: String,
    /// Raw `From:` header.
    pub from_raw: String,
    /// List address the message was delivered to, e.g. `dev.tooling.apache.org`.
    pub list_raw: String,
    pub subject: String,
    pub body: String,
    /// Unix epoch of delivery, when the archive knows it.
    pub epoch: Option<i64>,
    /// ISO datetime string as recorded by the archive.
    pub date: String,
}
