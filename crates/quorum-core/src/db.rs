use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::types::{
    CheckResult, CheckStatus, Committee, NewTask, Project, Release, ReleasePhase, ReleasePolicy,
    Revision, Task, TaskResult, TaskStatus, TaskType, LATEST_REVISION_NUMBER,
};

const SCHEMA_SQL: &str = include_str!("../../../schema.sql");

/// Process-wide handle over the relational store.
///
/// Reads go through short-lived implicit transactions; each orchestrator
/// command runs its writes inside one [`Store::with_tx`] commit so readers
/// observe either the pre-command or the post-command state.
pub struct Store {
    conn: Mutex<Connection>,
}

/// A borrowed data session; all queries and mutations live here so the same
/// code serves both direct reads and transactional command bodies.
pub struct Session<'a> {
    conn: &'a Connection,
}

// ── Timestamp helpers ─────────────────────────────────────────────────────

fn parse_ts(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn now_str() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Column helpers ────────────────────────────────────────────────────────

fn text_column<T>(
    idx: usize,
    s: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value: {s}").into(),
        )
    })
}

fn json_column<T: serde::de::DeserializeOwned>(idx: usize, s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ── Row mappers ───────────────────────────────────────────────────────────

fn row_to_committee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Committee> {
    let is_podling_int: i64 = row.get(3)?;
    let members: String = row.get(4)?;
    let committers: String = row.get(5)?;
    let participants: String = row.get(6)?;
    Ok(Committee {
        name: row.get(0)?,
        full_name: row.get(1)?,
        display_name: row.get(2)?,
        is_podling: is_podling_int != 0,
        members: json_column(4, &members)?,
        committers: json_column(5, &committers)?,
        participants: json_column(6, &participants)?,
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        name: row.get(0)?,
        display_name: row.get(1)?,
        short_display_name: row.get(2)?,
        committee_name: row.get(3)?,
    })
}

fn row_to_policy(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReleasePolicy> {
    let compose: String = row.get(3)?;
    let vote: String = row.get(4)?;
    let finish: String = row.get(5)?;
    Ok(ReleasePolicy {
        project_name: row.get(0)?,
        min_hours: row.get(1)?,
        github_repository_name: row.get(2)?,
        compose_workflow_paths: json_column(3, &compose)?,
        vote_workflow_paths: json_column(4, &vote)?,
        finish_workflow_paths: json_column(5, &finish)?,
    })
}

fn row_to_release(row: &rusqlite::Row<'_>) -> rusqlite::Result<Release> {
    let phase_str: String = row.get(3)?;
    let created_str: String = row.get(6)?;
    Ok(Release {
        name: row.get(0)?,
        project_name: row.get(1)?,
        version: row.get(2)?,
        phase: text_column(3, &phase_str, ReleasePhase::parse)?,
        latest_revision_number: row.get(4)?,
        podling_thread_id: row.get(5)?,
        created: parse_ts(&created_str),
    })
}

fn row_to_revision(row: &rusqlite::Row<'_>) -> rusqlite::Result<Revision> {
    let created_str: String = row.get(4)?;
    Ok(Revision {
        release_name: row.get(0)?,
        number: row.get(1)?,
        seq: row.get(2)?,
        asfuid: row.get(3)?,
        created: parse_ts(&created_str),
        description: row.get(5)?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let task_type_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let args_str: String = row.get(3)?;
    let result_str: Option<String> = row.get(4)?;
    let added_str: String = row.get(5)?;
    // Workers write results as raw JSON; shapes this crate does not know
    // read back as absent rather than failing the row.
    let result: Option<TaskResult> = result_str.and_then(|s| serde_json::from_str(&s).ok());
    Ok(Task {
        id: row.get(0)?,
        task_type: text_column(1, &task_type_str, TaskType::parse)?,
        status: text_column(2, &status_str, TaskStatus::parse)?,
        args: json_column(3, &args_str)?,
        result,
        added: parse_ts(&added_str),
        project_name: row.get(6)?,
        version_name: row.get(7)?,
        revision_number: row.get(8)?,
        asf_uid: row.get(9)?,
    })
}

fn row_to_check_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckResult> {
    let status_str: String = row.get(3)?;
    Ok(CheckResult {
        release_name: row.get(0)?,
        revision_number: row.get(1)?,
        checker: row.get(2)?,
        status: text_column(3, &status_str, CheckStatus::parse)?,
    })
}

const RELEASE_COLUMNS: &str =
    "name, project_name, version, phase, latest_revision_number, podling_thread_id, created";
const TASK_COLUMNS: &str =
    "id, task_type, status, task_args, result, added, project_name, version_name, \
     revision_number, asf_uid";

// ── Store ─────────────────────────────────────────────────────────────────

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Run `f` inside one BEGIN…COMMIT. Any error aborts the transaction.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        let out = {
            let session = Session { conn: &tx };
            f(&session)?
        };
        tx.commit()?;
        Ok(out)
    }

    fn session<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&Session { conn: &conn })
    }

    // One-statement conveniences; command bodies use `with_tx` instead.

    pub fn upsert_committee(&self, committee: &Committee) -> Result<()> {
        self.session(|s| s.upsert_committee(committee))
    }

    pub fn get_committee(&self, name: &str) -> Result<Option<Committee>> {
        self.session(|s| s.get_committee(name))
    }

    pub fn committees_with_member(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.session(|s| s.committees_with_member(asf_uid))
    }

    pub fn committees_with_committer(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.session(|s| s.committees_with_committer(asf_uid))
    }

    pub fn committees_with_participant(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.session(|s| s.committees_with_participant(asf_uid))
    }

    pub fn upsert_project(&self, project: &Project) -> Result<()> {
        self.session(|s| s.upsert_project(project))
    }

    pub fn get_project(&self, name: &str) -> Result<Option<Project>> {
        self.session(|s| s.get_project(name))
    }

    pub fn projects_by_committee(&self, committee_name: &str) -> Result<Vec<Project>> {
        self.session(|s| s.projects_by_committee(committee_name))
    }

    pub fn upsert_release_policy(&self, policy: &ReleasePolicy) -> Result<()> {
        self.session(|s| s.upsert_release_policy(policy))
    }

    pub fn get_release_policy(&self, project_name: &str) -> Result<Option<ReleasePolicy>> {
        self.session(|s| s.get_release_policy(project_name))
    }

    pub fn policies_for_repository(&self, repository_name: &str) -> Result<Vec<ReleasePolicy>> {
        self.session(|s| s.policies_for_repository(repository_name))
    }

    pub fn insert_release(&self, release: &Release) -> Result<()> {
        self.session(|s| s.insert_release(release))
    }

    pub fn get_release(&self, name: &str) -> Result<Option<Release>> {
        self.session(|s| s.get_release(name))
    }

    pub fn release_with_context(
        &self,
        name: &str,
    ) -> Result<Option<(Release, Project, Option<Committee>)>> {
        self.session(|s| s.release_with_context(name))
    }

    pub fn releases_by_phase(
        &self,
        project_name: &str,
        phase: ReleasePhase,
    ) -> Result<Vec<Release>> {
        self.session(|s| s.releases_by_phase(project_name, phase))
    }

    pub fn releases_for_project(&self, project_name: &str) -> Result<Vec<Release>> {
        self.session(|s| s.releases_for_project(project_name))
    }

    pub fn create_revision(
        &self,
        release_name: &str,
        asfuid: &str,
        description: &str,
    ) -> Result<Revision> {
        self.session(|s| s.create_revision(release_name, asfuid, description))
    }

    pub fn get_revision(&self, release_name: &str, number: &str) -> Result<Option<Revision>> {
        self.session(|s| s.get_revision(release_name, number))
    }

    pub fn max_seq_revision(&self, release_name: &str) -> Result<Option<Revision>> {
        self.session(|s| s.max_seq_revision(release_name))
    }

    pub fn insert_task(&self, new: NewTask) -> Result<Task> {
        self.session(|s| s.insert_task(new))
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        self.session(|s| s.get_task(id))
    }

    pub fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<()> {
        self.session(|s| s.update_task_status(id, status))
    }

    pub fn set_task_result(&self, id: i64, status: TaskStatus, result: &TaskResult) -> Result<()> {
        self.session(|s| s.set_task_result(id, status, result))
    }

    pub fn set_task_result_json(
        &self,
        id: i64,
        status: TaskStatus,
        result_json: &str,
    ) -> Result<()> {
        self.session(|s| s.set_task_result_json(id, status, result_json))
    }

    pub fn tasks_for_release(
        &self,
        project_name: &str,
        version_name: &str,
    ) -> Result<Vec<Task>> {
        self.session(|s| s.tasks_for_release(project_name, version_name))
    }

    pub fn latest_vote_task(
        &self,
        project_name: &str,
        version_name: &str,
        any_status: bool,
    ) -> Result<Option<Task>> {
        self.session(|s| s.latest_vote_task(project_name, version_name, any_status))
    }

    pub fn has_ongoing_vote_task(&self, project_name: &str, version_name: &str) -> Result<bool> {
        self.session(|s| s.has_ongoing_vote_task(project_name, version_name))
    }

    pub fn tasks_ongoing(
        &self,
        project_name: &str,
        version_name: &str,
        revision_number: Option<&str>,
    ) -> Result<i64> {
        self.session(|s| s.tasks_ongoing(project_name, version_name, revision_number))
    }

    pub fn tasks_ongoing_revision(
        &self,
        project_name: &str,
        version_name: &str,
        revision_number: Option<&str>,
    ) -> Result<(i64, Option<String>)> {
        self.session(|s| s.tasks_ongoing_revision(project_name, version_name, revision_number))
    }

    pub fn insert_check_result(&self, check: &CheckResult) -> Result<()> {
        self.session(|s| s.insert_check_result(check))
    }

    pub fn has_failing_checks(&self, release_name: &str, revision_number: &str) -> Result<bool> {
        self.session(|s| s.has_failing_checks(release_name, revision_number))
    }

    pub fn check_results(
        &self,
        release_name: &str,
        revision_number: &str,
    ) -> Result<Vec<CheckResult>> {
        self.session(|s| s.check_results(release_name, revision_number))
    }
}

// ── Session impl ──────────────────────────────────────────────────────────

impl Session<'_> {
    // ── Committees ────────────────────────────────────────────────────────

    pub fn upsert_committee(&self, committee: &Committee) -> Result<()> {
        self.conn.execute(
            "INSERT INTO committees \
             (name, full_name, display_name, is_podling, members, committers, participants) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(name) DO UPDATE SET \
               full_name = excluded.full_name, \
               display_name = excluded.display_name, \
               is_podling = excluded.is_podling, \
               members = excluded.members, \
               committers = excluded.committers, \
               participants = excluded.participants",
            params![
                committee.name,
                committee.full_name,
                committee.display_name,
                committee.is_podling as i64,
                serde_json::to_string(&committee.members)?,
                serde_json::to_string(&committee.committers)?,
                serde_json::to_string(&committee.participants)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_committee(&self, name: &str) -> Result<Option<Committee>> {
        let result = self
            .conn
            .query_row(
                "SELECT name, full_name, display_name, is_podling, members, committers, \
                 participants FROM committees WHERE name = ?1",
                params![name],
                row_to_committee,
            )
            .optional()?;
        Ok(result)
    }

    fn committees_where(&self, select: impl Fn(&Committee) -> bool) -> Result<Vec<Committee>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, full_name, display_name, is_podling, members, committers, \
             participants FROM committees ORDER BY name ASC",
        )?;
        let committees = stmt
            .query_map([], row_to_committee)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(committees.into_iter().filter(|c| select(c)).collect())
    }

    pub fn committees_with_member(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.committees_where(|c| c.members.iter().any(|m| m == asf_uid))
    }

    pub fn committees_with_committer(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.committees_where(|c| c.committers.iter().any(|m| m == asf_uid))
    }

    pub fn committees_with_participant(&self, asf_uid: &str) -> Result<Vec<Committee>> {
        self.committees_where(|c| c.participants.iter().any(|m| m == asf_uid))
    }

    // ── Projects ──────────────────────────────────────────────────────────

    pub fn upsert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (name, display_name, short_display_name, committee_name) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO UPDATE SET \
               display_name = excluded.display_name, \
               short_display_name = excluded.short_display_name, \
               committee_name = excluded.committee_name",
            params![
                project.name,
                project.display_name,
                project.short_display_name,
                project.committee_name,
            ],
        )?;
        Ok(())
    }

    pub fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let result = self
            .conn
            .query_row(
                "SELECT name, display_name, short_display_name, committee_name \
                 FROM projects WHERE name = ?1",
                params![name],
                row_to_project,
            )
            .optional()?;
        Ok(result)
    }

    pub fn projects_by_committee(&self, committee_name: &str) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, display_name, short_display_name, committee_name \
             FROM projects WHERE committee_name = ?1 ORDER BY name ASC",
        )?;
        let projects = stmt
            .query_map(params![committee_name], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    // ── Release policies ──────────────────────────────────────────────────

    pub fn upsert_release_policy(&self, policy: &ReleasePolicy) -> Result<()> {
        self.conn.execute(
            "INSERT INTO release_policies \
             (project_name, min_hours, github_repository_name, compose_workflow_paths, \
              vote_workflow_paths, finish_workflow_paths) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(project_name) DO UPDATE SET \
               min_hours = excluded.min_hours, \
               github_repository_name = excluded.github_repository_name, \
               compose_workflow_paths = excluded.compose_workflow_paths, \
               vote_workflow_paths = excluded.vote_workflow_paths, \
               finish_workflow_paths = excluded.finish_workflow_paths",
            params![
                policy.project_name,
                policy.min_hours,
                policy.github_repository_name,
                serde_json::to_string(&policy.compose_workflow_paths)?,
                serde_json::to_string(&policy.vote_workflow_paths)?,
                serde_json::to_string(&policy.finish_workflow_paths)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_release_policy(&self, project_name: &str) -> Result<Option<ReleasePolicy>> {
        let result = self
            .conn
            .query_row(
                "SELECT project_name, min_hours, github_repository_name, \
                 compose_workflow_paths, vote_workflow_paths, finish_workflow_paths \
                 FROM release_policies WHERE project_name = ?1",
                params![project_name],
                row_to_policy,
            )
            .optional()?;
        Ok(result)
    }

    pub fn policies_for_repository(&self, repository_name: &str) -> Result<Vec<ReleasePolicy>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_name, min_hours, github_repository_name, \
             compose_workflow_paths, vote_workflow_paths, finish_workflow_paths \
             FROM release_policies WHERE github_repository_name = ?1 ORDER BY project_name ASC",
        )?;
        let policies = stmt
            .query_map(params![repository_name], row_to_policy)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(policies)
    }

    // ── Releases ──────────────────────────────────────────────────────────

    pub fn insert_release(&self, release: &Release) -> Result<()> {
        let created = release.created.format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn.execute(
            "INSERT INTO releases \
             (name, project_name, version, phase, latest_revision_number, \
              podling_thread_id, created) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                release.name,
                release.project_name,
                release.version,
                release.phase.as_str(),
                release.latest_revision_number,
                release.podling_thread_id,
                created,
            ],
        )?;
        Ok(())
    }

    pub fn get_release(&self, name: &str) -> Result<Option<Release>> {
        let sql = format!("SELECT {RELEASE_COLUMNS} FROM releases WHERE name = ?1");
        let result = self
            .conn
            .query_row(&sql, params![name], row_to_release)
            .optional()?;
        Ok(result)
    }

    /// Release plus its project and (when bound) committee, in one read.
    pub fn release_with_context(
        &self,
        name: &str,
    ) -> Result<Option<(Release, Project, Option<Committee>)>> {
        let Some(release) = self.get_release(name)? else {
            return Ok(None);
        };
        let Some(project) = self.get_project(&release.project_name)? else {
            return Ok(None);
        };
        let committee = match &project.committee_name {
            Some(committee_name) => self.get_committee(committee_name)?,
            None => None,
        };
        Ok(Some((release, project, committee)))
    }

    pub fn releases_by_phase(
        &self,
        project_name: &str,
        phase: ReleasePhase,
    ) -> Result<Vec<Release>> {
        let sql = format!(
            "SELECT {RELEASE_COLUMNS} FROM releases \
             WHERE project_name = ?1 AND phase = ?2 ORDER BY created DESC, name DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let releases = stmt
            .query_map(params![project_name, phase.as_str()], row_to_release)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(releases)
    }

    pub fn releases_for_project(&self, project_name: &str) -> Result<Vec<Release>> {
        let sql = format!("SELECT {RELEASE_COLUMNS} FROM releases WHERE project_name = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let releases = stmt
            .query_map(params![project_name], row_to_release)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(releases)
    }

    pub fn update_release_phase(&self, name: &str, phase: ReleasePhase) -> Result<()> {
        self.conn.execute(
            "UPDATE releases SET phase = ?1 WHERE name = ?2",
            params![phase.as_str(), name],
        )?;
        Ok(())
    }

    pub fn set_podling_thread_id(&self, name: &str, thread_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE releases SET podling_thread_id = ?1 WHERE name = ?2",
            params![thread_id, name],
        )?;
        Ok(())
    }

    // ── Revisions ─────────────────────────────────────────────────────────

    /// Append a revision with the next `seq` and point the release's
    /// `latest_revision_number` at it.
    pub fn create_revision(
        &self,
        release_name: &str,
        asfuid: &str,
        description: &str,
    ) -> Result<Revision> {
        let seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM revisions WHERE release_name = ?1",
            params![release_name],
            |r| r.get(0),
        )?;
        let number = format!("{seq:05}");
        let created = now_str();
        self.conn.execute(
            "INSERT INTO revisions (release_name, number, seq, asfuid, created, description) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![release_name, number, seq, asfuid, created, description],
        )?;
        self.conn.execute(
            "UPDATE releases SET latest_revision_number = ?1 WHERE name = ?2",
            params![number, release_name],
        )?;
        Ok(Revision {
            release_name: release_name.to_string(),
            number,
            seq,
            asfuid: asfuid.to_string(),
            created: parse_ts(&created),
            description: description.to_string(),
        })
    }

    pub fn get_revision(&self, release_name: &str, number: &str) -> Result<Option<Revision>> {
        let result = self
            .conn
            .query_row(
                "SELECT release_name, number, seq, asfuid, created, description \
                 FROM revisions WHERE release_name = ?1 AND number = ?2",
                params![release_name, number],
                row_to_revision,
            )
            .optional()?;
        Ok(result)
    }

    pub fn max_seq_revision(&self, release_name: &str) -> Result<Option<Revision>> {
        let result = self
            .conn
            .query_row(
                "SELECT release_name, number, seq, asfuid, created, description \
                 FROM revisions WHERE release_name = ?1 ORDER BY seq DESC LIMIT 1",
                params![release_name],
                row_to_revision,
            )
            .optional()?;
        Ok(result)
    }

    // ── Tasks ─────────────────────────────────────────────────────────────

    pub fn insert_task(&self, new: NewTask) -> Result<Task> {
        let task_type = new.args.task_type();
        let added = now_str();
        self.conn.execute(
            "INSERT INTO tasks \
             (task_type, status, task_args, result, added, project_name, version_name, \
              revision_number, asf_uid) \
             VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8)",
            params![
                task_type.as_str(),
                new.status.as_str(),
                serde_json::to_string(&new.args)?,
                added,
                new.project_name,
                new.version_name,
                new.revision_number,
                new.asf_uid,
            ],
        )?;
        Ok(Task {
            id: self.conn.last_insert_rowid(),
            task_type,
            status: new.status,
            args: new.args,
            result: None,
            added: parse_ts(&added),
            project_name: new.project_name,
            version_name: new.version_name,
            revision_number: new.revision_number,
            asf_uid: new.asf_uid,
        })
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let result = self
            .conn
            .query_row(&sql, params![id], row_to_task)
            .optional()?;
        Ok(result)
    }

    pub fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    pub fn set_task_result(&self, id: i64, status: TaskStatus, result: &TaskResult) -> Result<()> {
        self.set_task_result_json(id, status, &serde_json::to_string(result)?)
    }

    /// Record a completion payload as the external workers deliver it.
    pub fn set_task_result_json(
        &self,
        id: i64,
        status: TaskStatus,
        result_json: &str,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET status = ?1, result = ?2 WHERE id = ?3",
            params![status.as_str(), result_json, id],
        )?;
        Ok(())
    }

    pub fn tasks_for_release(
        &self,
        project_name: &str,
        version_name: &str,
    ) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE project_name = ?1 AND version_name = ?2 ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![project_name, version_name], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Most recent `VOTE_INITIATE` task for the release whose result is
    /// present; unless `any_status`, tasks still queued or active are skipped.
    pub fn latest_vote_task(
        &self,
        project_name: &str,
        version_name: &str,
        any_status: bool,
    ) -> Result<Option<Task>> {
        let status_filter = if any_status {
            ""
        } else {
            "AND status NOT IN ('queued', 'active') "
        };
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE project_name = ?1 AND version_name = ?2 \
             AND task_type = 'vote_initiate' \
             {status_filter}\
             AND result IS NOT NULL \
             ORDER BY added DESC, id DESC LIMIT 1"
        );
        let result = self
            .conn
            .query_row(&sql, params![project_name, version_name], row_to_task)
            .optional()?;
        Ok(result)
    }

    pub fn has_ongoing_vote_task(&self, project_name: &str, version_name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks \
             WHERE project_name = ?1 AND version_name = ?2 \
             AND task_type = 'vote_initiate' AND status IN ('queued', 'active')",
            params![project_name, version_name],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Count queued/active tasks bound to one revision; an absent revision
    /// means tasks carrying the "latest" sentinel.
    pub fn tasks_ongoing(
        &self,
        project_name: &str,
        version_name: &str,
        revision_number: Option<&str>,
    ) -> Result<i64> {
        let revision = revision_number.unwrap_or(LATEST_REVISION_NUMBER);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks \
             WHERE project_name = ?1 AND version_name = ?2 AND revision_number = ?3 \
             AND status IN ('queued', 'active')",
            params![project_name, version_name, revision],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// As [`Session::tasks_ongoing`], but an absent revision binds to the
    /// maximal-`seq` revision via a subquery, and the resolved revision is
    /// returned alongside the count. Tasks carrying the "latest" sentinel
    /// count whenever the bound revision is the latest one.
    pub fn tasks_ongoing_revision(
        &self,
        project_name: &str,
        version_name: &str,
        revision_number: Option<&str>,
    ) -> Result<(i64, Option<String>)> {
        let release = crate::types::release_name(project_name, version_name);
        let row = self.conn.query_row(
            "SELECT COUNT(*), \
                    (SELECT number FROM revisions WHERE release_name = ?3 \
                     ORDER BY seq DESC LIMIT 1) \
             FROM tasks \
             WHERE project_name = ?1 AND version_name = ?2 \
             AND (revision_number = COALESCE(?4, \
                    (SELECT number FROM revisions WHERE release_name = ?3 \
                     ORDER BY seq DESC LIMIT 1)) \
                  OR (revision_number = ?5 \
                      AND COALESCE(?4, \
                            (SELECT number FROM revisions WHERE release_name = ?3 \
                             ORDER BY seq DESC LIMIT 1)) \
                          IS (SELECT number FROM revisions WHERE release_name = ?3 \
                              ORDER BY seq DESC LIMIT 1))) \
             AND status IN ('queued', 'active')",
            params![
                project_name,
                version_name,
                release,
                revision_number,
                LATEST_REVISION_NUMBER,
            ],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Option<String>>(1)?)),
        )?;
        Ok(row)
    }

    // ── Check results ─────────────────────────────────────────────────────

    pub fn insert_check_result(&self, check: &CheckResult) -> Result<()> {
        self.conn.execute(
            "INSERT INTO check_results (release_name, revision_number, checker, status) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                check.release_name,
                check.revision_number,
                check.checker,
                check.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn has_failing_checks(&self, release_name: &str, revision_number: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM check_results \
             WHERE release_name = ?1 AND revision_number = ?2 AND status = 'failure'",
            params![release_name, revision_number],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn check_results(
        &self,
        release_name: &str,
        revision_number: &str,
    ) -> Result<Vec<CheckResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT release_name, revision_number, checker, status \
             FROM check_results WHERE release_name = ?1 AND revision_number = ?2 \
             ORDER BY id ASC",
        )?;
        let checks = stmt
            .query_map(params![release_name, revision_number], row_to_check_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(checks)
    }
}
