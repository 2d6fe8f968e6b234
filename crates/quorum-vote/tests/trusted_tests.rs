mod common;

use common::{claims, committee, project, test_config, test_store, vote_policy, FixtureDirectory, FixtureVerifier};
use quorum_core::Error;
use quorum_vote::trusted::{trusted_workflow, TrustedPhase};

const WORKFLOW_REF: &str = "apache/foo/.github/workflows/release.yml@refs/heads/main";

fn seed_project(store: &quorum_core::db::Store) {
    store
        .upsert_committee(&committee("tooling", &["ada"], false))
        .unwrap();
    store.upsert_project(&project("foo", "tooling")).unwrap();
    store
        .upsert_release_policy(&vote_policy(
            "foo",
            "foo",
            &[".github/workflows/release.yml"],
        ))
        .unwrap();
}

fn directory() -> FixtureDirectory {
    let mut directory = FixtureDirectory::default();
    directory
        .github_to_uid
        .insert("12345".to_string(), "ada".to_string());
    directory
}

#[tokio::test]
async fn test_vote_phase_workflow_resolves_project() {
    let (_dir, store) = test_store();
    let config = test_config();
    seed_project(&store);
    let verifier = FixtureVerifier {
        claims: claims("12345", "apache/foo", WORKFLOW_REF),
    };

    let (claims, asf_uid, resolved) = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "github",
        "token",
        TrustedPhase::Vote,
    )
    .await
    .unwrap();

    assert_eq!(claims.repository, "apache/foo");
    assert_eq!(asf_uid, "ada");
    assert_eq!(resolved.name, "foo");
}

#[tokio::test]
async fn test_compose_phase_without_allowlisted_path_fails() {
    let (_dir, store) = test_store();
    let config = test_config();
    seed_project(&store);
    let verifier = FixtureVerifier {
        claims: claims("12345", "apache/foo", WORKFLOW_REF),
    };

    let err = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "github",
        "token",
        TrustedPhase::Compose,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ReleasePolicyNotFound(_)));
}

#[tokio::test]
async fn test_unsupported_publisher_fails() {
    let (_dir, store) = test_store();
    let config = test_config();
    let verifier = FixtureVerifier {
        claims: claims("12345", "apache/foo", WORKFLOW_REF),
    };

    let err = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "gitlab",
        "token",
        TrustedPhase::Vote,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Interaction(_)));
}

#[tokio::test]
async fn test_unmapped_actor_fails_with_user_missing() {
    let (_dir, store) = test_store();
    let config = test_config();
    seed_project(&store);
    let verifier = FixtureVerifier {
        claims: claims("99999", "apache/foo", WORKFLOW_REF),
    };

    let err = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "github",
        "token",
        TrustedPhase::Vote,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ApacheUserMissing { .. }));
}

#[tokio::test]
async fn test_non_allowlisted_committee_fails() {
    let (_dir, store) = test_store();
    let mut config = test_config();
    config.automated_release_committees = vec!["httpd".to_string()];
    seed_project(&store);
    let verifier = FixtureVerifier {
        claims: claims("12345", "apache/foo", WORKFLOW_REF),
    };

    let err = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "github",
        "token",
        TrustedPhase::Vote,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Interaction(_)));
}

#[tokio::test]
async fn test_malformed_repository_fails() {
    let (_dir, store) = test_store();
    let config = test_config();
    seed_project(&store);
    let verifier = FixtureVerifier {
        claims: claims("12345", "notapache/foo", "notapache/foo/.github/workflows/x.yml@main"),
    };

    let err = trusted_workflow(
        &store,
        &directory(),
        &verifier,
        &config,
        "github",
        "token",
        TrustedPhase::Vote,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Interaction(_)));
}
