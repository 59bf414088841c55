//! Evaluation verdicts and pipeline outcomes.

use http::StatusCode;
use std::fmt;

/// The outcome of evaluating one request against a rule set.
///
/// Verdicts are produced per evaluation call and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The engine allowed the request.
    Allow,
    /// The engine denied the request.
    Deny,
    /// The engine could not be reached or failed while evaluating.
    LoadError,
}

impl Verdict {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::LoadError => "load_error",
        }
    }

    /// Translates the verdict into a pipeline decision.
    ///
    /// `Deny` rejects with 403, `LoadError` with 500, `Allow` lets the
    /// pipeline continue.
    #[must_use]
    pub const fn into_outcome(self) -> PhaseOutcome {
        match self {
            Self::Allow => PhaseOutcome::Declined,
            Self::Deny => PhaseOutcome::Reject(StatusCode::FORBIDDEN),
            Self::LoadError => PhaseOutcome::Reject(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl From<bool> for Verdict {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a phase handler tells the host pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Pass-through: continue with the next handler or phase.
    Declined,
    /// Suspended: processing resumes later, the pipeline must neither proceed
    /// nor finalize the request now.
    Done,
    /// Terminate the request with the given status.
    Reject(StatusCode),
}

impl PhaseOutcome {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Declined => "declined",
            Self::Done => "suspended",
            Self::Reject(_) => "rejected",
        }
    }

    /// Returns the rejection status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Reject(status) => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the pipeline should continue.
    #[must_use]
    pub const fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }
}
