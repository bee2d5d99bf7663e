/// Target token that addresses every agent on the channel.
pub const BROADCAST_TARGET: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDecision {
    Accept,
    /// Addressed to some other agent. Not an error: nothing runs, nothing is sent.
    Ignore,
}

impl TargetDecision {
    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }
}

/// Filter stage of the broadcast bus.
///
/// Exact, case-insensitive match against [`BROADCAST_TARGET`] or the local
/// identity. No prefixes, no globs.
pub fn resolve(target_token: &str, local_identity: &str) -> TargetDecision {
    let token = target_token.trim().to_lowercase();
    if token.is_empty() {
        return TargetDecision::Ignore;
    }

    if token == BROADCAST_TARGET || token == local_identity.trim().to_lowercase() {
        TargetDecision::Accept
    } else {
        TargetDecision::Ignore
    }
}
