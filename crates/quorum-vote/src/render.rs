use quorum_core::types::{Committee, Project, Release, ARCHIVE_THREAD_URL};

use crate::identity::VoteStatus;
use crate::outcome::VoteSummary;
use crate::tabulate::TabulatedVotes;

/// Render the resolution email body.
///
/// The salutation addresses the committee, overridden to "Incubator" when the
/// release is in round 2 of a podling vote. Both archive URLs appear when a
/// first round exists. Tallies are sectioned binding first, then committer,
/// then contributor and unknown merged.
pub fn vote_resolution(
    committee: &Committee,
    release: &Release,
    project: &Project,
    tabulated_votes: &TabulatedVotes,
    summary: &VoteSummary,
    passed: bool,
    full_name: &str,
    asf_uid: &str,
    thread_id: &str,
) -> String {
    let mut lines = Vec::new();

    let committee_name = if release.podling_thread_id.is_some() {
        "Incubator"
    } else {
        committee.display_name.as_str()
    };
    lines.push(format!("Dear {committee_name} participants,"));
    lines.push(String::new());

    let outcome = if passed { "passed" } else { "failed" };
    lines.push(format!(
        "The vote on {} {} {outcome}.",
        project.name, release.version
    ));
    lines.push(String::new());

    if let Some(podling_thread_id) = &release.podling_thread_id {
        lines.push("The previous round of voting is archived at the following URL:".to_string());
        lines.push(String::new());
        lines.push(format!("{ARCHIVE_THREAD_URL}{podling_thread_id}"));
        lines.push(String::new());
        lines.push("The current vote thread is archived at the following URL:".to_string());
    } else {
        lines.push("The vote thread is archived at the following URL:".to_string());
    }
    lines.push(String::new());
    lines.push(format!("{ARCHIVE_THREAD_URL}{thread_id}"));
    lines.push(String::new());

    votes_section(&mut lines, tabulated_votes, &[VoteStatus::Binding]);

    let binding_total = summary.binding_votes;
    let were_word = if binding_total == 1 { "was" } else { "were" };
    let votes_word = if binding_total == 1 { "vote" } else { "votes" };
    lines.push(format!(
        "There {were_word} {binding_total} binding {votes_word}."
    ));
    lines.push(String::new());

    lines.push(format!(
        "Of these binding votes, {} were +1, {} were -1, and {} were 0.",
        summary.binding_votes_yes, summary.binding_votes_no, summary.binding_votes_abstain
    ));
    lines.push(String::new());

    votes_section(&mut lines, tabulated_votes, &[VoteStatus::Committer]);
    votes_section(
        &mut lines,
        tabulated_votes,
        &[VoteStatus::Contributor, VoteStatus::Unknown],
    );

    lines.push("Thank you for your participation.".to_string());
    lines.push(String::new());
    lines.push("Sincerely,".to_string());
    lines.push(format!("{full_name} ({asf_uid})"));

    lines.join("\n")
}

/// Emit one tally section; nothing at all when no voter matches.
fn votes_section(lines: &mut Vec<String>, tabulated_votes: &TabulatedVotes, statuses: &[VoteStatus]) {
    let labels = statuses
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(" and ");
    let mut header = Some(format!("The {labels} votes were cast as follows:"));

    for vote_email in tabulated_votes.values() {
        if !statuses.contains(&vote_email.status) {
            continue;
        }
        if let Some(text) = header.take() {
            lines.push(text);
            lines.push(String::new());
        }
        let mut status = vote_email.status.label().to_string();
        if vote_email.updated {
            status.push_str(", updated");
        }
        lines.push(format!(
            "{} {} ({status})",
            vote_email.vote.symbol(),
            vote_email.asf_uid_or_email
        ));
    }
    if header.is_none() {
        lines.push(String::new());
    }
}
