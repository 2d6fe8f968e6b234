use chrono::{DateTime, Utc};

use quorum_core::db::{Session, Store};
use quorum_core::types::{
    release_name, Project, Release, ReleasePhase, Revision, Task, TaskResult,
};
use quorum_core::{Error, Result};

/// Message id substituted for every vote task in dev environments, so local
/// resolutions reply to a real archived thread.
pub const TEST_MID: &str = "CAH5JyZo8QnWmg9CwRSwWY=GivhXW4NiLyeNJO71FKdK81J5-Uw@mail.gmail.com";

// ── Release listings ──────────────────────────────────────────────────────

/// Releases of the project in one phase, newest first by creation time.
pub fn releases_by_phase(
    store: &Store,
    project: &Project,
    phase: ReleasePhase,
) -> Result<Vec<Release>> {
    store.releases_by_phase(&project.name, phase)
}

pub fn candidate_drafts(store: &Store, project: &Project) -> Result<Vec<Release>> {
    releases_by_phase(store, project, ReleasePhase::CandidateDraft)
}

pub fn candidates(store: &Store, project: &Project) -> Result<Vec<Release>> {
    releases_by_phase(store, project, ReleasePhase::Candidate)
}

pub fn previews(store: &Store, project: &Project) -> Result<Vec<Release>> {
    releases_by_phase(store, project, ReleasePhase::Preview)
}

pub fn full_releases(store: &Store, project: &Project) -> Result<Vec<Release>> {
    releases_by_phase(store, project, ReleasePhase::Release)
}

/// Draft, candidate, and preview releases, in that order.
pub fn releases_in_progress(store: &Store, project: &Project) -> Result<Vec<Release>> {
    let mut releases = candidate_drafts(store, project)?;
    releases.extend(candidates(store, project)?);
    releases.extend(previews(store, project)?);
    Ok(releases)
}

/// All releases of the project, newest version first.
///
/// Versions are ordered by semver when every one of them parses; otherwise a
/// component-wise key is used where numeric components sort before strings
/// within a position.
pub fn all_releases(store: &Store, project: &Project) -> Result<Vec<Release>> {
    let mut releases = store.releases_for_project(&project.name)?;

    let parsed: Option<Vec<semver::Version>> = releases
        .iter()
        .map(|r| semver::Version::parse(&r.version).ok())
        .collect();
    match parsed {
        Some(versions) => {
            let mut pairs: Vec<(semver::Version, Release)> =
                versions.into_iter().zip(releases).collect();
            pairs.sort_by(|a, b| b.0.cmp(&a.0));
            Ok(pairs.into_iter().map(|(_, release)| release).collect())
        }
        None => {
            releases.sort_by(|a, b| fallback_key(&b.version).cmp(&fallback_key(&a.version)));
            Ok(releases)
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum VersionPart {
    Number(i64),
    Text(String),
}

fn fallback_key(version: &str) -> Vec<VersionPart> {
    version
        .replace(['+', '-'], ".")
        .split('.')
        .map(|part| match part.parse::<i64>() {
            Ok(n) => VersionPart::Number(n),
            Err(_) => VersionPart::Text(part.to_string()),
        })
        .collect()
}

/// Per-user view of unfinished releases: `(short_display_name, project_name,
/// releases)` for every project of a committee the user participates in,
/// sorted by project display name, releases newest first. Projects with no
/// active release are omitted.
pub fn unfinished_releases(
    store: &Store,
    asf_uid: &str,
) -> Result<Vec<(String, String, Vec<Release>)>> {
    let mut projects = Vec::new();
    for committee in store.committees_with_participant(asf_uid)? {
        projects.extend(store.projects_by_committee(&committee.name)?);
    }
    projects.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    projects.dedup_by(|a, b| a.name == b.name);

    let mut results = Vec::new();
    for project in projects {
        let mut active = releases_in_progress(store, &project)?;
        if active.is_empty() {
            continue;
        }
        active.sort_by(|a, b| b.created.cmp(&a.created));
        results.push((project.short_display_name, project.name, active));
    }
    Ok(results)
}

// ── Revisions ─────────────────────────────────────────────────────────────

/// `(number, editor, timestamp)` of the latest revision, when one exists.
pub fn latest_info(
    store: &Store,
    project_name: &str,
    version_name: &str,
) -> Result<Option<(String, String, DateTime<Utc>)>> {
    let name = release_name(project_name, version_name);
    let release = store
        .get_release(&name)?
        .ok_or_else(|| Error::NotFound(format!("Release {name} does not exist")))?;
    let Some(number) = release.latest_revision_number else {
        return Ok(None);
    };
    let Some(revision) = store.get_revision(&name, &number)? else {
        return Ok(None);
    };
    Ok(Some((revision.number, revision.asfuid, revision.created)))
}

pub fn latest_revision(store: &Store, release: &Release) -> Result<Option<Revision>> {
    match &release.latest_revision_number {
        None => Ok(None),
        Some(number) => store.get_revision(&release.name, number),
    }
}

// ── Checks and tasks ──────────────────────────────────────────────────────

pub fn has_failing_checks(
    store: &Store,
    release: &Release,
    revision_number: &str,
) -> Result<bool> {
    store.has_failing_checks(&release.name, revision_number)
}

/// Count queued/active tasks for `(project, version, revision)`; an absent
/// revision matches tasks carrying the "latest" sentinel.
pub fn tasks_ongoing(
    store: &Store,
    project_name: &str,
    version_name: &str,
    revision_number: Option<&str>,
) -> Result<i64> {
    store.tasks_ongoing(project_name, version_name, revision_number)
}

/// As [`tasks_ongoing`], but an absent revision binds to the maximal-`seq`
/// revision, which is returned alongside the count. Tasks carrying the
/// "latest" sentinel count whenever the bound revision is the latest one.
pub fn tasks_ongoing_revision(
    store: &Store,
    project_name: &str,
    version_name: &str,
    revision_number: Option<&str>,
) -> Result<(i64, Option<String>)> {
    store.tasks_ongoing_revision(project_name, version_name, revision_number)
}

/// Most recent `VOTE_INITIATE` task for this release that has finished and
/// carries a result; dev environments drop the status filter.
pub fn release_latest_vote_task(
    store: &Store,
    release: &Release,
    dev_environment: bool,
) -> Result<Option<Task>> {
    store.latest_vote_task(&release.project_name, &release.version, dev_environment)
}

/// Archive message id recorded by a vote task, or the test constant in dev
/// environments regardless of task contents.
pub fn task_mid_get(task: &Task, dev_environment: bool) -> Option<String> {
    if dev_environment {
        return Some(TEST_MID.to_string());
    }
    match &task.result {
        Some(TaskResult::VoteInitiate(result)) => Some(result.mid.clone()),
        None => None,
    }
}

// ── Promotion ─────────────────────────────────────────────────────────────

/// Verify and promote a candidate draft to a candidate.
///
/// The named revision must exist and have no failing checks. Runs inside the
/// caller's transaction so the phase change commits with the vote task.
pub fn promote_release(
    session: &Session<'_>,
    release: &Release,
    revision_number: &str,
) -> Result<()> {
    if release.phase != ReleasePhase::CandidateDraft {
        return Err(Error::Interaction(format!(
            "Release {} is not a candidate draft",
            release.name
        )));
    }
    if session.get_revision(&release.name, revision_number)?.is_none() {
        return Err(Error::NotFound(format!(
            "Revision {revision_number} of {} does not exist",
            release.name
        )));
    }
    if session.has_failing_checks(&release.name, revision_number)? {
        return Err(Error::Interaction(format!(
            "Revision {revision_number} of {} has failing checks",
            release.name
        )));
    }
    session.update_release_phase(&release.name, ReleasePhase::Candidate)?;
    Ok(())
}
