//! Phase result codes.

use std::fmt;

use crate::error::SchedulerError;

/// Outcome category of a scheduling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Proceed to the next phase.
    Success,
    /// Internal fault; the runtime decides whether to retry the cycle.
    Error,
    /// This host is rejected; other hosts may still fit.
    Unschedulable,
    /// The workload is rejected outright; no host will help.
    UnschedulableAndUnresolvable,
    /// Bypass this phase family for the workload.
    Skip,
}

/// Result of a phase invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(Code::Success, "")
    }

    pub fn skip() -> Self {
        Self::new(Code::Skip, "")
    }

    pub fn unschedulable(message: impl Into<String>) -> Self {
        Self::new(Code::Unschedulable, message)
    }

    pub fn unresolvable(message: impl Into<String>) -> Self {
        Self::new(Code::UnschedulableAndUnresolvable, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Code::Error, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    pub fn is_skip(&self) -> bool {
        self.code == Code::Skip
    }

    /// Unschedulable or unresolvable.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.code,
            Code::Unschedulable | Code::UnschedulableAndUnresolvable
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

impl From<SchedulerError> for Status {
    fn from(err: SchedulerError) -> Self {
        Status::error(err.to_string())
    }
}
