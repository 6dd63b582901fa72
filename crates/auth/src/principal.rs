use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use taskboard_core::UserId;

use crate::Role;

/// The authenticated actor a request is performed by.
///
/// Handlers resolve this from an already-authenticated session; policy code
/// never reads ambient request state, it only ever receives a `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Strongest capability granted by the principal's role set.
    pub fn capability(&self) -> Capability {
        if self.has_role(Role::Admin) {
            Capability::Administer
        } else if self.has_role(Role::Editor) {
            Capability::Author
        } else {
            Capability::Observe
        }
    }
}

/// Baseline capability derived from a role set.
///
/// `Observe` covers viewers and principals holding no role at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Any task, any user.
    Administer,
    /// Own tasks only; may create and mutate them.
    Author,
    /// Own tasks only; read-only.
    Observe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_dominates_mixed_role_sets() {
        let p = Principal::new(UserId::new(1), [Role::Viewer, Role::Admin]);
        assert_eq!(p.capability(), Capability::Administer);
    }

    #[test]
    fn editor_with_viewer_is_author() {
        let p = Principal::new(UserId::new(1), [Role::Viewer, Role::Editor]);
        assert_eq!(p.capability(), Capability::Author);
    }

    #[test]
    fn no_roles_only_observes() {
        let p = Principal::new(UserId::new(1), []);
        assert_eq!(p.capability(), Capability::Observe);
        assert!(!p.is_admin());
    }
}
