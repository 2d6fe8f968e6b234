use quorum_core::types::ReleasePolicy;

use crate::ballot::Vote;
use crate::identity::VoteStatus;
use crate::tabulate::TabulatedVotes;

/// Default vote duration floor, in hours, for projects without a policy.
pub const DEFAULT_MIN_HOURS: f64 = 72.0;

/// Tallies of a tabulated thread, grouped by voter standing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteSummary {
    pub binding_votes: u32,
    pub binding_votes_yes: u32,
    pub binding_votes_no: u32,
    pub binding_votes_abstain: u32,
    pub non_binding_votes: u32,
    pub non_binding_votes_yes: u32,
    pub non_binding_votes_no: u32,
    pub non_binding_votes_abstain: u32,
    pub unknown_votes: u32,
    pub unknown_votes_yes: u32,
    pub unknown_votes_no: u32,
    pub unknown_votes_abstain: u32,
}

pub fn vote_summary(tabulated_votes: &TabulatedVotes) -> VoteSummary {
    let mut summary = VoteSummary::default();
    for vote_email in tabulated_votes.values() {
        let (total, yes, no, abstain) = match vote_email.status {
            VoteStatus::Binding => (
                &mut summary.binding_votes,
                &mut summary.binding_votes_yes,
                &mut summary.binding_votes_no,
                &mut summary.binding_votes_abstain,
            ),
            VoteStatus::Committer | VoteStatus::Contributor => (
                &mut summary.non_binding_votes,
                &mut summary.non_binding_votes_yes,
                &mut summary.non_binding_votes_no,
                &mut summary.non_binding_votes_abstain,
            ),
            VoteStatus::Unknown => (
                &mut summary.unknown_votes,
                &mut summary.unknown_votes_yes,
                &mut summary.unknown_votes_no,
                &mut summary.unknown_votes_abstain,
            ),
        };
        *total += 1;
        match vote_email.vote {
            Vote::Yes => *yes += 1,
            Vote::No => *no += 1,
            Vote::Abstain => *abstain += 1,
            Vote::Unknown => {}
        }
    }
    summary
}

/// Compute pass/fail and the human-readable outcome sentence.
///
/// `min_hours` comes from the policy, defaulting to 72 when the project has
/// none; a policy value of 0 or absent means no minimum. Only binding votes
/// count: the vote passes iff at least three binding +1s outnumber the
/// binding -1s.
pub fn vote_outcome(
    policy: Option<&ReleasePolicy>,
    start_unixtime: Option<i64>,
    tabulated_votes: &TabulatedVotes,
    now: i64,
) -> (bool, String) {
    let duration_hours = match start_unixtime {
        Some(start) => (now - start) as f64 / 3600.0,
        None => 0.0,
    };

    let min_hours = match policy {
        None => Some(DEFAULT_MIN_HOURS),
        Some(policy) => match policy.min_hours {
            Some(hours) if hours > 0 => Some(hours as f64),
            _ => None,
        },
    };
    let duration_hours_remaining = min_hours.map(|min| min - duration_hours);

    let mut binding_plus_one = 0u32;
    let mut binding_minus_one = 0u32;
    for vote_email in tabulated_votes.values() {
        if vote_email.status != VoteStatus::Binding {
            continue;
        }
        match vote_email.vote {
            Vote::Yes => binding_plus_one += 1,
            Vote::No => binding_minus_one += 1,
            _ => {}
        }
    }

    outcome_format(duration_hours_remaining, binding_plus_one, binding_minus_one)
}

fn outcome_format(
    duration_hours_remaining: Option<f64>,
    binding_plus_one: u32,
    binding_minus_one: u32,
) -> (bool, String) {
    let passed = (binding_plus_one >= 3) && (binding_plus_one > binding_minus_one);
    let still_open = matches!(duration_hours_remaining, Some(remaining) if remaining > 0.0);

    let message = match (passed, still_open) {
        (false, true) => format!(
            "The vote is still open for {:.2} hours, but it would fail if closed now.",
            duration_hours_remaining.unwrap_or(0.0)
        ),
        (false, false) => match duration_hours_remaining {
            None => "The vote would fail if closed now.".to_string(),
            Some(_) => "The vote failed.".to_string(),
        },
        (true, true) => format!(
            "The vote is still open for {:.2} hours, but it would pass if closed now.",
            duration_hours_remaining.unwrap_or(0.0)
        ),
        (true, false) => "The vote passed.".to_string(),
    };
    (passed, message)
}
