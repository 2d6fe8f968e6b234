use serde::{Deserialize, Serialize};

/// A single vote stance as cast in an email body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Yes,
    No,
    Abstain,
    Unknown,
}

impl Vote {
    /// Symbol used in tallies and resolution bodies.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Yes => "+1",
            Self::No => "-1",
            Self::Abstain => "0",
            Self::Unknown => "?",
        }
    }
}

/// Markers the [VOTE] template uses to explain how to vote; lines carrying
/// them are never castings.
const TEMPLATE_MARKERS: [&str; 4] = ["[ ] +1", "[ ] -1", "binding +1 votes", "binding -1 votes"];

fn is_continue(line: &str) -> bool {
    if TEMPLATE_MARKERS.iter().any(|marker| line.contains(marker)) {
        return true;
    }
    // Quoted from another email
    line.starts_with('>')
}

fn is_break(line: &str) -> bool {
    if line == "-- " {
        // Start of a signature
        return true;
    }
    if line.starts_with("On ") && line.get(6..8) == Some(", ") {
        // Start of a quoted email
        return true;
    }
    if line.starts_with("From: ") {
        // Start of a quoted email
        return true;
    }
    if line.starts_with("________") {
        // Sometimes used as an "On " style quotation marker
        return true;
    }
    false
}

/// Scan an email body top to bottom and collect the author's castings with
/// the lines they appeared on. Quoted and template lines are skipped; lines
/// matching more than one stance are dropped as ambiguous.
pub fn castings(body: &str) -> Vec<(Vote, String)> {
    let mut castings = Vec::new();
    for line in body.split('\n') {
        if is_continue(line) {
            continue;
        }
        if is_break(line) {
            break;
        }

        let plus_one = line.starts_with("+1") || line.contains(" +1");
        let minus_one = line.starts_with("-1") || line.contains(" -1");
        // Zero votes need stricter matching; "0" appears in prose too often
        let zero = matches!(line, "0" | "-0" | "+0")
            || line.starts_with("0 ")
            || line.starts_with("+0 ")
            || line.starts_with("-0 ");

        if (plus_one && minus_one) || (plus_one && zero) || (minus_one && zero) {
            // Confusing result
            continue;
        }
        if plus_one {
            castings.push((Vote::Yes, line.to_string()));
        } else if minus_one {
            castings.push((Vote::No, line.to_string()));
        } else if zero {
            castings.push((Vote::Abstain, line.to_string()));
        }
    }
    castings
}
