use bazaar_auth::Identity;
use bazaar_core::UserId;

/// Caller context for a request (the authenticated identity).
///
/// Inserted by the auth middleware; required by every mutating route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    identity: Identity,
}

impl CallerContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }
}
