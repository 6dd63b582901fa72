use chrono::{DateTime, Utc};
use uuid::Uuid;

use taskboard_auth::{Principal, UserAccount};

/// The bearer token a request was authenticated with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Principal context for a request (authenticated account + its roles).
///
/// Roles are read from the store on every request, so a role change takes
/// effect on the next call without re-issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    account: UserAccount,
    principal: Principal,
    session: SessionToken,
}

impl PrincipalContext {
    pub fn new(account: UserAccount, session: SessionToken) -> Self {
        let principal = account.principal();
        Self {
            account,
            principal,
            session,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn account(&self) -> &UserAccount {
        &self.account
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }
}
