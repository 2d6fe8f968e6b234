use tracing::info;

use quorum_core::archive::MailArchive;
use quorum_core::config::Config;
use quorum_core::db::{Session, Store};
use quorum_core::types::{
    release_name, Committee, MessageSendArgs, NewTask, Project, Release, ReleasePhase, Task,
    TaskArgs, TaskStatus, VoteInitiateArgs, FOUNDATION_MAIL_DOMAIN, LATEST_REVISION_NUMBER,
};
use quorum_core::{Error, Result};

use crate::interaction;

/// Duration offered on the start form when the caller expresses no choice.
pub const DEFAULT_VOTE_DURATION_HOURS: i64 = 72;

const PREVIEW_REVISION_DESCRIPTION: &str =
    "Create a preview revision from the last candidate draft";
const NO_VOTE_THREAD_MESSAGE: &str = "No vote thread found, unable to send resolution message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteResolution {
    Passed,
    Failed,
}

impl VoteResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// Proof that a caller may act as a member of one committee.
///
/// Construct with [`CommitteeMember::assume`], which checks the caller's uid
/// against the committee's member set (or the configured admin uids).
/// Operations take the proven role value rather than re-deriving it.
#[derive(Debug, Clone)]
pub struct CommitteeMember {
    asf_uid: String,
    full_name: String,
    committee: Committee,
}

impl CommitteeMember {
    pub fn assume(
        store: &Store,
        config: &Config,
        asf_uid: &str,
        full_name: &str,
        committee_name: &str,
    ) -> Result<Self> {
        let committee = store
            .get_committee(committee_name)?
            .ok_or_else(|| Error::NotFound(format!("Committee {committee_name} not found")))?;
        let is_admin = config.admin_uids.iter().any(|admin| admin == asf_uid);
        if !committee.is_member(asf_uid) && !is_admin {
            return Err(Error::Access(
                "You do not have permission to perform this action".to_string(),
            ));
        }
        Ok(Self {
            asf_uid: asf_uid.to_string(),
            full_name: full_name.to_string(),
            committee,
        })
    }

    pub fn asf_uid(&self) -> &str {
        &self.asf_uid
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn committee(&self) -> &Committee {
        &self.committee
    }
}

/// Parameters of a vote start.
#[derive(Debug, Clone)]
pub struct VoteStart {
    pub project_name: String,
    pub version_name: String,
    pub email_to: String,
    pub revision_number: String,
    /// Advisory duration in hours, carried in the task payload.
    pub vote_duration: i64,
    pub subject: String,
    pub body: String,
    /// Promote the release from candidate draft to candidate first.
    pub promote: bool,
    /// Recipient allowlist override; derived from the caller's committees
    /// when absent.
    pub permitted_recipients: Option<Vec<String>>,
}

/// Committed state returned by a resolve command.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub release: Release,
    pub voting_round: Option<u8>,
    pub success_message: String,
    /// Non-fatal post-commit failure, e.g. no prior vote thread to reply to.
    pub error_message: Option<String>,
}

/// The release-vote state machine.
///
/// Each public operation validates, then runs its writes in one transaction;
/// external lookups (archive URLs, thread sources) happen before the
/// transaction opens so a crash cannot leave partial state.
pub struct VoteOrchestrator<'a> {
    store: &'a Store,
    archive: &'a dyn MailArchive,
    config: &'a Config,
}

impl<'a> VoteOrchestrator<'a> {
    pub fn new(store: &'a Store, archive: &'a dyn MailArchive, config: &'a Config) -> Self {
        Self {
            store,
            archive,
            config,
        }
    }

    /// Open a vote on a release: verify the recipient, optionally promote the
    /// candidate draft, and queue the `VOTE_INITIATE` task.
    pub async fn start(&self, member: &CommitteeMember, request: VoteStart) -> Result<Task> {
        let name = release_name(&request.project_name, &request.version_name);
        let (release, _project, _committee) = self
            .store
            .release_with_context(&name)?
            .ok_or_else(|| Error::Access("Release not found".to_string()))?;

        let permitted = match &request.permitted_recipients {
            Some(explicit) => explicit.clone(),
            None => self.permitted_recipients(member.asf_uid())?,
        };
        if !permitted.contains(&request.email_to) {
            // Re-checked by the vote-initiate worker for extra safety
            info!(
                "invalid mailing list choice: {} not in {:?}",
                request.email_to, permitted
            );
            return Err(Error::Access("Invalid mailing list choice".to_string()));
        }

        self.store.with_tx(|session| {
            if request.promote {
                interaction::promote_release(session, &release, &request.revision_number)?;
            }
            queue_vote_initiate(
                session,
                self.config,
                &release,
                &request.email_to,
                request.vote_duration,
                member.asf_uid(),
                member.full_name(),
                &request.subject,
                &request.body,
            )
        })
    }

    /// Resolve the vote on a candidate release and queue the resolution
    /// messages. Dispatches on the podling voting round.
    pub async fn resolve(
        &self,
        member: &CommitteeMember,
        project_name: &str,
        version_name: &str,
        vote_result: VoteResolution,
        resolution_body: &str,
    ) -> Result<ResolveOutcome> {
        let name = release_name(project_name, version_name);
        let context = self
            .store
            .release_with_context(&name)?
            .filter(|(release, _, _)| release.phase == ReleasePhase::Candidate)
            .ok_or_else(|| Error::Access("Release not found".to_string()))?;
        let (release, project, committee) = context;
        let committee = committee.ok_or_else(|| {
            Error::Interaction(format!("Project {} has no committee", project.name))
        })?;

        let voting_round = if committee.is_podling {
            Some(if release.podling_thread_id.is_none() { 1 } else { 2 })
        } else {
            None
        };

        let latest_vote_task = interaction::release_latest_vote_task(
            self.store,
            &release,
            self.config.dev_environment,
        )?
        .ok_or_else(|| Error::NotFound(NO_VOTE_THREAD_MESSAGE.to_string()))?;

        self.resolve_release(
            member,
            release,
            project,
            voting_round,
            vote_result,
            latest_vote_task,
            resolution_body,
        )
        .await
    }

    /// Apply a vote result to a release.
    ///
    /// A passed round-1 podling vote keeps the phase, records the round-1
    /// thread id, and queues the round-2 incubator vote; any other pass moves
    /// to preview with a fresh revision; a fail returns to candidate draft.
    /// The phase change, any new vote task, and all resolution messages
    /// commit together.
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_release(
        &self,
        member: &CommitteeMember,
        release: Release,
        project: Project,
        voting_round: Option<u8>,
        vote_result: VoteResolution,
        latest_vote_task: Task,
        resolution_body: &str,
    ) -> Result<ResolveOutcome> {
        let vote_thread_mid =
            interaction::task_mid_get(&latest_vote_task, self.config.dev_environment);
        let round_one_pass =
            voting_round == Some(1) && vote_result == VoteResolution::Passed;

        // External lookups before the transaction opens.
        let round_two_thread_id = if round_one_pass {
            let archive_url = match &vote_thread_mid {
                Some(mid) => self.archive.archive_url(mid).await?,
                None => None,
            };
            let archive_url = archive_url.ok_or_else(|| {
                Error::Interaction("No archive URL found for podling vote".to_string())
            })?;
            let thread_id = archive_url
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            Some(thread_id)
        } else {
            None
        };

        let extra_destination = if vote_result == VoteResolution::Passed
            && voting_round == Some(2)
        {
            match &release.podling_thread_id {
                Some(podling_thread_id) => {
                    Some(self.archive.thread_source(podling_thread_id).await?)
                }
                None => None,
            }
        } else {
            None
        };

        let resolution_sends = vote_thread_mid.as_deref().map(|mid| {
            resolution_messages(
                member,
                &project,
                &release,
                &latest_vote_task,
                vote_result,
                resolution_body,
                mid,
                extra_destination.as_ref(),
            )
        });

        let (release, success_message) = self.store.with_tx(|session| {
            let mut release = release.clone();
            let success_message = if round_one_pass {
                let thread_id = round_two_thread_id.clone().unwrap_or_default();
                if release.latest_revision_number.is_none() {
                    return Err(Error::Interaction(
                        "Release has no revision number".to_string(),
                    ));
                }
                session.set_podling_thread_id(&release.name, &thread_id)?;
                release.podling_thread_id = Some(thread_id);

                let vote_duration = match &latest_vote_task.args {
                    TaskArgs::VoteInitiate(args) => args.vote_duration,
                    TaskArgs::MessageSend(_) => DEFAULT_VOTE_DURATION_HOURS,
                };
                queue_vote_initiate(
                    session,
                    self.config,
                    &release,
                    &self.config.incubator_vote_address,
                    vote_duration,
                    member.asf_uid(),
                    member.full_name(),
                    &format!(
                        "[VOTE] Release {} {}",
                        project.display_name, release.version
                    ),
                    &incubator_vote_body(&project.display_name, &release.version),
                )?;
                "Project PPMC vote marked as passed, and Incubator PMC vote automatically started"
            } else if vote_result == VoteResolution::Passed {
                session.update_release_phase(&release.name, ReleasePhase::Preview)?;
                release.phase = ReleasePhase::Preview;
                let revision = session.create_revision(
                    &release.name,
                    member.asf_uid(),
                    PREVIEW_REVISION_DESCRIPTION,
                )?;
                release.latest_revision_number = Some(revision.number);
                "Vote marked as passed"
            } else {
                session.update_release_phase(&release.name, ReleasePhase::CandidateDraft)?;
                release.phase = ReleasePhase::CandidateDraft;
                "Vote marked as failed"
            };

            if let Some(messages) = &resolution_sends {
                for message in messages {
                    session.insert_task(NewTask {
                        status: TaskStatus::Queued,
                        args: TaskArgs::MessageSend(message.clone()),
                        project_name: release.project_name.clone(),
                        version_name: release.version.clone(),
                        revision_number: Some(LATEST_REVISION_NUMBER.to_string()),
                        asf_uid: member.asf_uid().to_string(),
                    })?;
                }
            }

            Ok((release, success_message.to_string()))
        })?;

        let error_message = if resolution_sends.is_none() {
            Some(NO_VOTE_THREAD_MESSAGE.to_string())
        } else {
            None
        };

        Ok(ResolveOutcome {
            release,
            voting_round,
            success_message,
            error_message,
        })
    }

    /// Lists the caller may post a vote to: the dev list of every committee
    /// they participate in, plus the test address in dev environments.
    fn permitted_recipients(&self, asf_uid: &str) -> Result<Vec<String>> {
        let mut recipients: Vec<String> = self
            .store
            .committees_with_participant(asf_uid)?
            .into_iter()
            .map(|committee| format!("dev@{}.{FOUNDATION_MAIL_DOMAIN}", committee.name))
            .collect();
        if self.config.dev_environment {
            recipients.push(self.config.user_tests_address.clone());
        }
        Ok(recipients)
    }
}

/// Queue one `VOTE_INITIATE` task, enforcing the single-ongoing-vote rule
/// outside dev environments. The task binds to the latest revision via the
/// sentinel so the in-flight counters see it.
#[allow(clippy::too_many_arguments)]
fn queue_vote_initiate(
    session: &Session<'_>,
    config: &Config,
    release: &Release,
    email_to: &str,
    vote_duration: i64,
    initiator_id: &str,
    initiator_fullname: &str,
    subject: &str,
    body: &str,
) -> Result<Task> {
    if !config.dev_environment
        && session.has_ongoing_vote_task(&release.project_name, &release.version)?
    {
        return Err(Error::Interaction(format!(
            "A vote on {} is already in progress",
            release.name
        )));
    }
    session.insert_task(NewTask {
        status: TaskStatus::Queued,
        args: TaskArgs::VoteInitiate(VoteInitiateArgs {
            release_name: release.name.clone(),
            email_to: email_to.to_string(),
            vote_duration,
            initiator_id: initiator_id.to_string(),
            initiator_fullname: initiator_fullname.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }),
        project_name: release.project_name.clone(),
        version_name: release.version.clone(),
        revision_number: Some(LATEST_REVISION_NUMBER.to_string()),
        asf_uid: initiator_id.to_string(),
    })
}

/// Build the resolution reply for the vote thread, plus one for the round-1
/// thread when a second destination is known.
#[allow(clippy::too_many_arguments)]
fn resolution_messages(
    member: &CommitteeMember,
    project: &Project,
    release: &Release,
    latest_vote_task: &Task,
    vote_result: VoteResolution,
    body: &str,
    vote_thread_mid: &str,
    extra_destination: Option<&(String, String)>,
) -> Vec<MessageSendArgs> {
    let email_recipient = match &latest_vote_task.args {
        TaskArgs::VoteInitiate(args) => args.email_to.clone(),
        TaskArgs::MessageSend(args) => args.email_recipient.clone(),
    };
    let email_sender = format!("{}@{FOUNDATION_MAIL_DOMAIN}", member.asf_uid());
    let subject = format!(
        "[VOTE] [RESULT] Release {} {} {}",
        project.display_name,
        release.version,
        vote_result.as_str().to_uppercase()
    );
    let signature = if member.full_name() == member.asf_uid() {
        format!("-- \n{}", member.full_name())
    } else {
        format!("-- \n{} ({})", member.full_name(), member.asf_uid())
    };
    let body = format!("{body}\n\n{signature}");

    let mut messages = vec![MessageSendArgs {
        email_sender: email_sender.clone(),
        email_recipient,
        subject: subject.clone(),
        body: body.clone(),
        in_reply_to: vote_thread_mid.to_string(),
    }];
    if let Some((recipient, message_id)) = extra_destination {
        messages.push(MessageSendArgs {
            email_sender,
            email_recipient: recipient.clone(),
            subject,
            body,
            in_reply_to: message_id.clone(),
        });
    }
    messages
}

/// Default body of the automatically-started incubator vote.
fn incubator_vote_body(project_display_name: &str, version: &str) -> String {
    let mut lines = Vec::new();
    lines.push("Hello Incubator PMC,".to_string());
    lines.push(String::new());
    lines.push(format!(
        "The {project_display_name} community has voted on and approved a proposal \
         to release {project_display_name} {version}."
    ));
    lines.push(
        "We now kindly request the Incubator PMC members review and vote on this \
         incubator release."
            .to_string(),
    );
    lines.push(String::new());
    lines.push("Please vote accordingly:".to_string());
    lines.push(String::new());
    lines.push("[ ] +1 Release this package".to_string());
    lines.push("[ ] -1 Do not release this package because ...".to_string());
    lines.join("\n")
}
