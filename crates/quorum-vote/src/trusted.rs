use tracing::info;

use quorum_core::config::Config;
use quorum_core::db::Store;
use quorum_core::directory::Directory;
use quorum_core::types::Project;
use quorum_core::verifier::{OidcClaims, TokenVerifier};
use quorum_core::{Error, Result};

/// Release phase an automation workflow is authorized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustedPhase {
    Compose,
    Vote,
    Finish,
}

impl TrustedPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::Vote => "vote",
            Self::Finish => "finish",
        }
    }
}

/// Accept a signed automation token from a CI provider and locate the
/// project authorized for its workflow in the given phase.
///
/// Returns the verified claims, the foundation uid bound to the token's
/// actor, and the authorized project.
pub async fn trusted_workflow(
    store: &Store,
    directory: &dyn Directory,
    verifier: &dyn TokenVerifier,
    config: &Config,
    publisher: &str,
    token: &str,
    phase: TrustedPhase,
) -> Result<(OidcClaims, String, Project)> {
    if publisher != "github" {
        return Err(Error::Interaction(format!(
            "Publisher {publisher} not supported"
        )));
    }
    let claims = verifier.verify_github_oidc(token).await?;
    let asf_uid = directory
        .github_to_apache(&claims.actor_id)
        .await?
        .ok_or_else(|| Error::ApacheUserMissing {
            message: format!(
                "No foundation account is bound to actor id {}",
                claims.actor_id
            ),
            fingerprint: None,
            primary_uid: None,
        })?;
    let project = trusted_project(store, config, &claims.repository, &claims.workflow_ref, phase)?;
    Ok((claims, asf_uid, project))
}

fn trusted_project(
    store: &Store,
    config: &Config,
    repository: &str,
    workflow_ref: &str,
    phase: TrustedPhase,
) -> Result<Project> {
    info!("trusted workflow claims: {repository} {workflow_ref}");
    let (repository_name, workflow_path) = trusted_project_checks(repository, workflow_ref)?;

    let policy = store
        .policies_for_repository(repository_name)?
        .into_iter()
        .find(|policy| {
            let paths = match phase {
                TrustedPhase::Compose => &policy.compose_workflow_paths,
                TrustedPhase::Vote => &policy.vote_workflow_paths,
                TrustedPhase::Finish => &policy.finish_workflow_paths,
            };
            paths.iter().any(|path| path == workflow_path)
        })
        .ok_or_else(|| {
            Error::ReleasePolicyNotFound(format!(
                "Release policy for repository {repository_name} and {} workflow path \
                 {workflow_path} not found",
                phase.as_str()
            ))
        })?;

    let project = store.get_project(&policy.project_name)?.ok_or_else(|| {
        Error::Interaction(format!(
            "Project for release policy {} not found",
            policy.project_name
        ))
    })?;
    let committee_name = project
        .committee_name
        .clone()
        .ok_or_else(|| Error::Interaction(format!("Project {} has no committee", project.name)))?;
    let committee = store
        .get_committee(&committee_name)?
        .ok_or_else(|| Error::Interaction(format!("Project {} has no committee", project.name)))?;
    if !config
        .automated_release_committees
        .iter()
        .any(|name| *name == committee.name)
    {
        return Err(Error::Interaction(format!(
            "Project {} is not in a committee that can make releases",
            project.name
        )));
    }
    Ok(project)
}

/// Split `apache/<name>` and `<repository>/<workflow_path>@<git_ref>`,
/// requiring the workflow to live under `.github/workflows/`.
fn trusted_project_checks<'a>(
    repository: &'a str,
    workflow_ref: &'a str,
) -> Result<(&'a str, &'a str)> {
    let Some(repository_name) = repository.strip_prefix("apache/") else {
        return Err(Error::Interaction(
            "Repository must start with 'apache/'".to_string(),
        ));
    };
    let Some(workflow_path_at) = workflow_ref
        .strip_prefix(repository)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Err(Error::Interaction(format!(
            "Workflow ref must start with repository, got {workflow_ref}"
        )));
    };
    let Some((workflow_path, _git_ref)) = workflow_path_at.rsplit_once('@') else {
        return Err(Error::Interaction(format!(
            "Workflow path must contain '@', got {workflow_path_at}"
        )));
    };
    if !workflow_path.starts_with(".github/workflows/") {
        return Err(Error::Interaction(format!(
            "Workflow path must start with '.github/workflows/', got {workflow_path}"
        )));
    }
    Ok((repository_name, workflow_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_split_repository_and_workflow() {
        let (repo, path) = trusted_project_checks(
            "apache/foo",
            "apache/foo/.github/workflows/release.yml@refs/heads/main",
        )
        .unwrap();
        assert_eq!(repo, "foo");
        assert_eq!(path, ".github/workflows/release.yml");
    }

    #[test]
    fn test_checks_reject_foreign_repository() {
        let err = trusted_project_checks(
            "contoso/foo",
            "contoso/foo/.github/workflows/release.yml@main",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Interaction(_)));
    }

    #[test]
    fn test_checks_reject_mismatched_workflow_ref() {
        let err = trusted_project_checks(
            "apache/foo",
            "apache/bar/.github/workflows/release.yml@main",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Interaction(_)));
    }

    #[test]
    fn test_checks_reject_missing_git_ref() {
        let err =
            trusted_project_checks("apache/foo", "apache/foo/.github/workflows/release.yml")
                .unwrap_err();
        assert!(matches!(err, Error::Interaction(_)));
    }

    #[test]
    fn test_checks_reject_workflow_outside_workflows_dir() {
        let err = trusted_project_checks("apache/foo", "apache/foo/build/release.yml@main")
            .unwrap_err();
        assert!(matches!(err, Error::Interaction(_)));
    }
}
