use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::info;

use quorum_core::archive::MailArchive;
use quorum_core::config::Config;
use quorum_core::db::Store;
use quorum_core::directory::Directory;
use quorum_core::types::Committee;
use quorum_core::Result;

use crate::ballot::{castings, Vote};
use crate::identity::{sender_identity, voter_status, VoteStatus};

/// One voter's latest stance in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEmail {
    pub asf_uid_or_email: String,
    pub from_email: String,
    pub status: VoteStatus,
    /// Archive message id the stance came from.
    pub asf_eid: String,
    pub iso_datetime: String,
    pub vote: Vote,
    /// The casting line, or all casting lines joined by `" // "`.
    pub quotation: String,
    /// True when this entry replaced an earlier one from the same voter.
    pub updated: bool,
}

/// Latest stance per voter, in first-seen order.
pub type TabulatedVotes = IndexMap<String, VoteEmail>;

/// Tabulate a vote thread.
///
/// Streams the thread chronologically, resolving each sender against a fresh
/// directory snapshot and parsing castings out of the body. Later messages
/// from the same voter replace earlier ones. A subject containing `[RESULT]`
/// ends the scan before that message is processed. Returns the epoch of the
/// first processed message and the tabulated map.
pub async fn tabulate(
    archive: &dyn MailArchive,
    directory: &dyn Directory,
    committee: Option<&Committee>,
    thread_id: &str,
) -> Result<(Option<i64>, TabulatedVotes)> {
    let snapshot_start = Instant::now();
    let email_to_uid = directory.email_to_uid_map().await?;
    info!(
        "directory snapshot: {} addresses in {} ms",
        email_to_uid.len(),
        snapshot_start.elapsed().as_millis()
    );

    let tabulate_start = Instant::now();
    let mut tabulated: TabulatedVotes = IndexMap::new();
    let mut start_unixtime = None;

    let mut messages = archive.thread_messages(thread_id).await?;
    while let Some(message) = messages.next().await {
        let message = message?;
        let Some(identity) = sender_identity(&message.from_raw, &email_to_uid) else {
            continue;
        };

        let status = match &identity.asf_uid {
            Some(asf_uid) => voter_status(asf_uid, committee),
            None => VoteStatus::Unknown,
        };
        let voter_key = identity.voter_key().to_string();

        if start_unixtime.is_none() {
            start_unixtime = message.epoch;
        }

        if message.subject.contains("[RESULT]") {
            break;
        }

        if message.body.is_empty() {
            continue;
        }

        let cast = castings(&message.body);
        if cast.is_empty() {
            continue;
        }

        let vote = if cast.len() == 1 { cast[0].0 } else { Vote::Unknown };
        let quotation = cast
            .iter()
            .map(|(_, line)| line.as_str())
            .collect::<Vec<_>>()
            .join(" // ");

        let vote_email = VoteEmail {
            asf_uid_or_email: voter_key.clone(),
            from_email: identity.from_email,
            status,
            asf_eid: message.mid,
            iso_datetime: message.date,
            vote,
            quotation,
            updated: tabulated.contains_key(&voter_key),
        };
        tabulated.insert(voter_key, vote_email);
    }

    info!(
        "tabulated {} votes in {} ms",
        tabulated.len(),
        tabulate_start.elapsed().as_millis()
    );
    Ok((start_unixtime, tabulated))
}

/// Committee whose role sets govern a vote thread.
///
/// Normally the release project's committee; dev environments derive the
/// committee label from the first archived message's list address instead,
/// so local threads tabulate against real role sets.
pub async fn vote_committee(
    store: &Store,
    config: &Config,
    archive: &dyn MailArchive,
    thread_id: &str,
    release_committee: Option<Committee>,
) -> Result<Option<Committee>> {
    if !config.dev_environment {
        return Ok(release_committee);
    }
    let mut messages = archive.thread_messages(thread_id).await?;
    let Some(first) = messages.next().await else {
        return Ok(release_committee);
    };
    let first = first?;
    let label = committee_label(&first.list_raw);
    store.get_committee(label)
}

/// `dev.tooling.apache.org` → `tooling`.
fn committee_label(list_raw: &str) -> &str {
    let prefix = list_raw.split(".apache.org").next().unwrap_or("");
    match prefix.split_once('.') {
        Some((_, rest)) => rest,
        None => prefix,
    }
}
