use anyhow::Result;
use chrono::Utc;

use quorum_core::db::Store;
use quorum_core::types::{
    release_name, CheckResult, CheckStatus, Committee, MessageSendArgs, NewTask, Project, Release,
    ReleasePhase, TaskArgs, TaskResult, TaskStatus, TaskType, VoteInitiateArgs, VoteInitiateResult,
};
use quorum_core::Error;

fn test_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quorum.db");
    let store = Store::open(path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();
    (dir, store)
}

fn committee(name: &str) -> Committee {
    Committee {
        name: name.to_string(),
        full_name: format!("Apache {name}"),
        display_name: name.to_string(),
        is_podling: false,
        members: vec!["ada".to_string(), "bob".to_string()],
        committers: vec!["cleo".to_string()],
        participants: vec!["ada".to_string(), "bob".to_string(), "cleo".to_string()],
    }
}

fn seed_release(store: &Store, project_name: &str, version: &str) -> Release {
    store.upsert_committee(&committee(project_name)).unwrap();
    store
        .upsert_project(&Project {
            name: project_name.to_string(),
            display_name: project_name.to_string(),
            short_display_name: project_name.to_string(),
            committee_name: Some(project_name.to_string()),
        })
        .unwrap();
    let release = Release {
        name: release_name(project_name, version),
        project_name: project_name.to_string(),
        version: version.to_string(),
        phase: ReleasePhase::CandidateDraft,
        latest_revision_number: None,
        podling_thread_id: None,
        created: Utc::now(),
    };
    store.insert_release(&release).unwrap();
    release
}

fn vote_args(release: &Release) -> TaskArgs {
    TaskArgs::VoteInitiate(VoteInitiateArgs {
        release_name: release.name.clone(),
        email_to: "dev@grove.apache.org".to_string(),
        vote_duration: 72,
        initiator_id: "ada".to_string(),
        initiator_fullname: "Ada Lovelace".to_string(),
        subject: "[VOTE] Release".to_string(),
        body: "Please vote.".to_string(),
    })
}

#[test]
fn test_committee_role_sets_round_trip() -> Result<()> {
    let (_dir, store) = test_store();
    let original = committee("grove");
    store.upsert_committee(&original)?;

    let loaded = store.get_committee("grove")?.unwrap();
    assert_eq!(loaded.members, original.members);
    assert_eq!(loaded.committers, original.committers);
    assert_eq!(loaded.participants, original.participants);
    assert!(!loaded.is_podling);

    assert_eq!(store.committees_with_member("ada")?.len(), 1);
    assert_eq!(store.committees_with_member("cleo")?.len(), 0);
    assert_eq!(store.committees_with_committer("cleo")?.len(), 1);
    assert_eq!(store.committees_with_participant("cleo")?.len(), 1);
    Ok(())
}

#[test]
fn test_task_args_round_trip_with_discriminator() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");

    let vote = store.insert_task(NewTask {
        status: TaskStatus::Queued,
        args: vote_args(&release),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;
    assert_eq!(vote.task_type, TaskType::VoteInitiate);

    let send = store.insert_task(NewTask {
        status: TaskStatus::Queued,
        args: TaskArgs::MessageSend(MessageSendArgs {
            email_sender: "ada@apache.org".to_string(),
            email_recipient: "dev@grove.apache.org".to_string(),
            subject: "[VOTE] [RESULT] Release".to_string(),
            body: "body".to_string(),
            in_reply_to: "mid".to_string(),
        }),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;
    assert_eq!(send.task_type, TaskType::MessageSend);

    let loaded = store.get_task(vote.id)?.unwrap();
    assert!(matches!(loaded.args, TaskArgs::VoteInitiate(_)));
    let loaded = store.get_task(send.id)?.unwrap();
    assert!(matches!(loaded.args, TaskArgs::MessageSend(_)));

    store.update_task_status(send.id, TaskStatus::Active)?;
    let loaded = store.get_task(send.id)?.unwrap();
    assert_eq!(loaded.status, TaskStatus::Active);
    Ok(())
}

#[test]
fn test_task_result_round_trip() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");
    let task = store.insert_task(NewTask {
        status: TaskStatus::Active,
        args: vote_args(&release),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;

    store.set_task_result(
        task.id,
        TaskStatus::Completed,
        &TaskResult::VoteInitiate(VoteInitiateResult {
            mid: "mid-1".to_string(),
            archive_url: "https://lists.apache.org/thread/t1".to_string(),
        }),
    )?;

    let loaded = store.get_task(task.id)?.unwrap();
    assert_eq!(loaded.status, TaskStatus::Completed);
    match loaded.result {
        Some(TaskResult::VoteInitiate(result)) => {
            assert_eq!(result.mid, "mid-1");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_unknown_result_shape_reads_back_as_absent() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");
    let task = store.insert_task(NewTask {
        status: TaskStatus::Active,
        args: vote_args(&release),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;

    store.set_task_result_json(task.id, TaskStatus::Completed, r#"{"task_type":"mystery"}"#)?;
    let loaded = store.get_task(task.id)?.unwrap();
    assert!(loaded.result.is_none());
    Ok(())
}

#[test]
fn test_create_revision_assigns_sequential_numbers() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");

    let first = store.create_revision(&release.name, "ada", "first")?;
    assert_eq!(first.number, "00001");
    assert_eq!(first.seq, 1);

    let second = store.create_revision(&release.name, "bob", "second")?;
    assert_eq!(second.number, "00002");
    assert_eq!(second.seq, 2);

    let loaded = store.get_release(&release.name)?.unwrap();
    assert_eq!(loaded.latest_revision_number.as_deref(), Some("00002"));

    let max = store.max_seq_revision(&release.name)?.unwrap();
    assert_eq!(max.number, "00002");
    assert_eq!(max.asfuid, "bob");
    Ok(())
}

#[test]
fn test_with_tx_rolls_back_on_error() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");

    let result: Result<(), Error> = store.with_tx(|session| {
        session.insert_task(NewTask {
            status: TaskStatus::Queued,
            args: vote_args(&release),
            project_name: release.project_name.clone(),
            version_name: release.version.clone(),
            revision_number: None,
            asf_uid: "ada".to_string(),
        })?;
        session.update_release_phase(&release.name, ReleasePhase::Candidate)?;
        Err(Error::Interaction("abort".to_string()))
    });
    assert!(result.is_err());

    // Neither the task nor the phase change survived the abort.
    assert!(store.tasks_for_release("grove", "0.2.0")?.is_empty());
    let loaded = store.get_release(&release.name)?.unwrap();
    assert_eq!(loaded.phase, ReleasePhase::CandidateDraft);
    Ok(())
}

#[test]
fn test_latest_vote_task_prefers_newest() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");

    let result = TaskResult::VoteInitiate(VoteInitiateResult {
        mid: "mid".to_string(),
        archive_url: "https://lists.apache.org/thread/t1".to_string(),
    });
    let older = store.insert_task(NewTask {
        status: TaskStatus::Queued,
        args: vote_args(&release),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;
    store.set_task_result(older.id, TaskStatus::Completed, &result)?;
    let newer = store.insert_task(NewTask {
        status: TaskStatus::Queued,
        args: vote_args(&release),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: None,
        asf_uid: "ada".to_string(),
    })?;
    store.set_task_result(newer.id, TaskStatus::Completed, &result)?;

    let found = store.latest_vote_task("grove", "0.2.0", false)?.unwrap();
    assert_eq!(found.id, newer.id);
    Ok(())
}

#[test]
fn test_has_failing_checks() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");
    store.create_revision(&release.name, "ada", "first")?;

    store.insert_check_result(&CheckResult {
        release_name: release.name.clone(),
        revision_number: "00001".to_string(),
        checker: "signature".to_string(),
        status: CheckStatus::Warning,
    })?;
    assert!(!store.has_failing_checks(&release.name, "00001")?);

    store.insert_check_result(&CheckResult {
        release_name: release.name.clone(),
        revision_number: "00001".to_string(),
        checker: "license".to_string(),
        status: CheckStatus::Failure,
    })?;
    assert!(store.has_failing_checks(&release.name, "00001")?);
    assert_eq!(store.check_results(&release.name, "00001")?.len(), 2);
    Ok(())
}

#[test]
fn test_release_with_context_loads_project_and_committee() -> Result<()> {
    let (_dir, store) = test_store();
    let release = seed_release(&store, "grove", "0.2.0");

    let (loaded, project, committee) = store.release_with_context(&release.name)?.unwrap();
    assert_eq!(loaded.name, release.name);
    assert_eq!(project.name, "grove");
    assert_eq!(committee.unwrap().name, "grove");

    assert!(store.release_with_context("grove-9.9.9")?.is_none());
    Ok(())
}
