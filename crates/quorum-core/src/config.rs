use std::collections::HashMap;

use crate::error::Result;

/// Application configuration loaded from environment / .env file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enables the hard-coded test message id, relaxes the single-ongoing-vote
    /// constraint, and loosens the latest-vote-task status filter.
    pub dev_environment: bool,
    pub database_path: String,
    /// Recipient of automatically-started round-2 incubator votes.
    pub incubator_vote_address: String,
    /// Extra permitted recipient in dev environments.
    pub user_tests_address: String,
    /// Committees whose projects may release through trusted automation.
    pub automated_release_committees: Vec<String>,
    /// Uids allowed to act on any committee.
    pub admin_uids: Vec<String>,
}

fn parse_dotenv() -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return map;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_bool(key: &str, dotenv: &HashMap<String, String>, default: bool) -> bool {
    match get(key, dotenv).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        Some(_) => default,
        None => default,
    }
}

fn get_list(key: &str, dotenv: &HashMap<String, String>, default: &str) -> Vec<String> {
    get_str(key, dotenv, default)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dotenv = parse_dotenv();

        Ok(Config {
            dev_environment: get_bool("DEV_ENVIRONMENT", &dotenv, false),
            database_path: get_str("DATABASE_PATH", &dotenv, "store/quorum.db"),
            incubator_vote_address: get_str(
                "INCUBATOR_VOTE_ADDRESS",
                &dotenv,
                "general@incubator.apache.org",
            ),
            user_tests_address: get_str(
                "USER_TESTS_ADDRESS",
                &dotenv,
                "user-tests@tooling.apache.org",
            ),
            automated_release_committees: get_list(
                "AUTOMATED_RELEASE_COMMITTEES",
                &dotenv,
                "tooling",
            ),
            admin_uids: get_list("ADMIN_UIDS", &dotenv, ""),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dev_environment: false,
            database_path: "store/quorum.db".to_string(),
            incubator_vote_address: "general@incubator.apache.org".to_string(),
            user_tests_address: "user-tests@tooling.apache.org".to_string(),
            automated_release_committees: vec!["tooling".to_string()],
            admin_uids: Vec::new(),
        }
    }
}
