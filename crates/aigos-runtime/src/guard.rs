use aigos_policy::Decision;

/// Raised by [`RuntimeContext::guard`](crate::RuntimeContext::guard) when the
/// gated action is denied and the caller asked to throw rather than receive
/// `None`. Carries the full [`Decision`] so the reason, `deniedBy` and any
/// recommendations survive past the guard boundary.
#[derive(Debug)]
pub struct GuardDenied {
    pub decision: Decision,
}

impl std::fmt::Display for GuardDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "guard denied: {}", self.decision.reason)
    }
}

impl std::error::Error for GuardDenied {}
