#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use quorum_core::archive::{MailArchive, MessageStream};
use quorum_core::config::Config;
use quorum_core::db::Store;
use quorum_core::directory::Directory;
use quorum_core::types::{
    release_name, ArchiveMessage, Committee, Project, Release, ReleasePhase, ReleasePolicy,
};
use quorum_core::verifier::{OidcClaims, TokenVerifier};
use quorum_core::{Error, Result};

// ── External-interface fixtures ──────────────────────────────────────────

#[derive(Default)]
pub struct FixtureArchive {
    /// thread_id → messages, in delivery order.
    pub threads: HashMap<String, Vec<ArchiveMessage>>,
    /// message id → archive URL.
    pub urls: HashMap<String, String>,
    /// thread_id → (list_address, message_id).
    pub sources: HashMap<String, (String, String)>,
}

#[async_trait]
impl MailArchive for FixtureArchive {
    async fn thread_messages(&self, thread_id: &str) -> Result<MessageStream> {
        let messages = self.threads.get(thread_id).cloned().unwrap_or_default();
        Ok(Box::pin(tokio_stream::iter(
            messages.into_iter().map(Ok::<_, Error>),
        )))
    }

    async fn thread_source(&self, thread_id: &str) -> Result<(String, String)> {
        self.sources
            .get(thread_id)
            .cloned()
            .ok_or_else(|| Error::External(format!("unknown thread {thread_id}")))
    }

    async fn archive_url(&self, mid: &str) -> Result<Option<String>> {
        Ok(self.urls.get(mid).cloned())
    }
}

#[derive(Default)]
pub struct FixtureDirectory {
    pub email_to_uid: HashMap<String, String>,
    pub github_to_uid: HashMap<String, String>,
}

#[async_trait]
impl Directory for FixtureDirectory {
    async fn email_to_uid_map(&self) -> Result<HashMap<String, String>> {
        Ok(self.email_to_uid.clone())
    }

    async fn github_to_apache(&self, actor_id: &str) -> Result<Option<String>> {
        Ok(self.github_to_uid.get(actor_id).cloned())
    }
}

pub struct FixtureVerifier {
    pub claims: OidcClaims,
}

#[async_trait]
impl TokenVerifier for FixtureVerifier {
    async fn verify_github_oidc(&self, _jwt: &str) -> Result<OidcClaims> {
        Ok(self.claims.clone())
    }
}

pub fn claims(actor_id: &str, repository: &str, workflow_ref: &str) -> OidcClaims {
    OidcClaims {
        actor_id: actor_id.to_string(),
        repository: repository.to_string(),
        workflow_ref: workflow_ref.to_string(),
        extra: serde_json::Map::new(),
    }
}

// ── Record builders ──────────────────────────────────────────────────────

pub fn message(mid: &str, from_raw: &str, subject: &str, body: &str, epoch: i64) -> ArchiveMessage {
    ArchiveMessage {
        mid: mid.to_string(),
        from_raw: from_raw.to_string(),
        list_raw: "dev.tooling.apache.org".to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        epoch: Some(epoch),
        date: "2024-06-03T12:00:00Z".to_string(),
    }
}

pub fn committee(name: &str, members: &[&str], is_podling: bool) -> Committee {
    Committee {
        name: name.to_string(),
        full_name: format!("Apache {name}"),
        display_name: titlecase(name),
        is_podling,
        members: members.iter().map(|m| m.to_string()).collect(),
        committers: Vec::new(),
        participants: members.iter().map(|m| m.to_string()).collect(),
    }
}

pub fn project(name: &str, committee_name: &str) -> Project {
    Project {
        name: name.to_string(),
        display_name: titlecase(name),
        short_display_name: titlecase(name),
        committee_name: Some(committee_name.to_string()),
    }
}

pub fn release(project_name: &str, version: &str, phase: ReleasePhase) -> Release {
    Release {
        name: release_name(project_name, version),
        project_name: project_name.to_string(),
        version: version.to_string(),
        phase,
        latest_revision_number: None,
        podling_thread_id: None,
        created: Utc::now(),
    }
}

pub fn vote_policy(project_name: &str, repository: &str, vote_paths: &[&str]) -> ReleasePolicy {
    ReleasePolicy {
        project_name: project_name.to_string(),
        min_hours: None,
        github_repository_name: Some(repository.to_string()),
        compose_workflow_paths: Vec::new(),
        vote_workflow_paths: vote_paths.iter().map(|p| p.to_string()).collect(),
        finish_workflow_paths: Vec::new(),
    }
}

fn titlecase(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn vote_email(
    key: &str,
    status: quorum_vote::identity::VoteStatus,
    vote: quorum_vote::ballot::Vote,
    updated: bool,
) -> quorum_vote::tabulate::VoteEmail {
    quorum_vote::tabulate::VoteEmail {
        asf_uid_or_email: key.to_string(),
        from_email: if key.contains('@') {
            key.to_string()
        } else {
            format!("{key}@apache.org")
        },
        status,
        asf_eid: format!("mid-{key}"),
        iso_datetime: "2024-06-03T12:00:00Z".to_string(),
        vote,
        quotation: vote.symbol().to_string(),
        updated,
    }
}

// ── Store setup ──────────────────────────────────────────────────────────

pub fn test_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quorum.db");
    let store = Store::open(path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();
    (dir, store)
}

pub fn test_config() -> Config {
    Config::default()
}
