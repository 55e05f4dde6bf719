use serde::{Deserialize, Serialize};

/// The only reply text that approves a request, after normalization.
pub const APPROVAL_KEYWORD: &str = "yes";

/// Outcome of classifying an inbound reply.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    Approved,
    NotApproved,
}

impl Approval {
    /// Classify already-normalized reply text.
    pub fn from_normalized(text: &str) -> Self {
        if text == APPROVAL_KEYWORD {
            Approval::Approved
        } else {
            Approval::NotApproved
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, Approval::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Approval::Approved => "approved",
            Approval::NotApproved => "not_approved",
        }
    }
}

impl std::fmt::Display for Approval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
