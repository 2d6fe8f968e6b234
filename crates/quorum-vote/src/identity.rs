use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use quorum_core::types::{Committee, FOUNDATION_MAIL_DOMAIN};

/// A voter's standing relative to the committee running the vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Binding,
    Committer,
    Contributor,
    Unknown,
}

impl VoteStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Binding => "binding",
            Self::Committer => "committer",
            Self::Contributor => "contributor",
            Self::Unknown => "unknown",
        }
    }
}

/// Sender of one archived message, resolved against the directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    /// Lowercased address with any trailing `.invalid` label stripped.
    pub from_email: String,
    pub asf_uid: Option<String>,
}

impl SenderIdentity {
    /// The key a voter tabulates under: uid when known, address otherwise.
    pub fn voter_key(&self) -> &str {
        self.asf_uid.as_deref().unwrap_or(&self.from_email)
    }
}

/// Extract the first RFC-5322 address from a raw `From:` header, lowercased.
fn extract_address(from_raw: &str) -> Option<String> {
    let parsed = mailparse::addrparse(from_raw).ok()?;
    for addr in parsed.iter() {
        match addr {
            mailparse::MailAddr::Single(info) => {
                let addr = info.addr.trim().to_lowercase();
                if !addr.is_empty() {
                    return Some(addr);
                }
            }
            mailparse::MailAddr::Group(group) => {
                if let Some(info) = group.addrs.first() {
                    let addr = info.addr.trim().to_lowercase();
                    if !addr.is_empty() {
                        return Some(addr);
                    }
                }
            }
        }
    }
    None
}

/// Resolve a raw `From:` header to a sender identity.
///
/// Mailing lists obfuscate sender domains with a trailing `.invalid` label,
/// which is stripped before lookup. A foundation-domain address is its own
/// uid; anything else goes through the snapshot. Senders with a plain email
/// and no uid still resolve, with `asf_uid` absent.
pub fn sender_identity(
    from_raw: &str,
    email_to_uid: &HashMap<String, String>,
) -> Option<SenderIdentity> {
    let address = extract_address(from_raw)?;
    let address = address
        .strip_suffix(".invalid")
        .unwrap_or(&address)
        .to_string();

    let foundation_suffix = format!("@{FOUNDATION_MAIL_DOMAIN}");
    let asf_uid = if let Some(local) = address.strip_suffix(&foundation_suffix) {
        Some(local.to_string())
    } else {
        email_to_uid.get(&address).cloned()
    };

    Some(SenderIdentity {
        from_email: address,
        asf_uid,
    })
}

/// Classify a uid against a committee's role sets.
pub fn voter_status(asf_uid: &str, committee: Option<&Committee>) -> VoteStatus {
    match committee {
        None => VoteStatus::Unknown,
        Some(committee) => {
            if committee.is_member(asf_uid) {
                VoteStatus::Binding
            } else if committee.is_committer(asf_uid) {
                VoteStatus::Committer
            } else {
                VoteStatus::Contributor
            }
        }
    }
}
