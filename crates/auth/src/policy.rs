//! Task and user authorization policy.
//!
//! Every function here is a pure decision over `(principal, action, owner
//! facts)`:
//! - No IO
//! - No panics
//! - Same inputs, same decision
//!
//! Owner-independent gates (`can_attempt_*`) run before anything is loaded;
//! owner checks get concrete owner ids from the loaded resource. A deny is a
//! verdict to surface to the caller, never an error to retry.

use serde::Serialize;
use thiserror::Error;

use taskboard_core::UserId;

use crate::{Capability, Principal};

/// Why a policy check denied an action.
///
/// The `Display` text is the client-facing reason string.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("not authorized")]
    NotAuthorized,

    #[error("role not permitted to create tasks")]
    RoleCannotCreateTasks,

    #[error("only admins may assign tasks to other users")]
    OnlyAdminsAssignTasks,

    #[error("only admins may change task assignment")]
    OnlyAdminsReassignTasks,

    #[error("cannot delete own account")]
    CannotDeleteSelf,
}

/// Outcome of a policy check. Ephemeral; never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

impl AuthDecision {
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub const fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    /// Convert into a `Result` so handlers can use `?`.
    pub fn into_result(self) -> Result<(), DenyReason> {
        if self.allowed {
            Ok(())
        } else {
            Err(self.reason.unwrap_or(DenyReason::NotAuthorized))
        }
    }

    fn only_if(cond: bool, reason: DenyReason) -> Self {
        if cond { Self::allow() } else { Self::deny(reason) }
    }
}

/// Which tasks a principal may list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TaskListScope {
    /// `true`: every task. `false`: only tasks owned by the principal.
    pub allow_all: bool,
}

impl TaskListScope {
    /// Owner filter the caller must apply, if any.
    pub fn owner_filter(&self, principal: &Principal) -> Option<UserId> {
        if self.allow_all { None } else { Some(principal.id) }
    }
}

/// Mutating actions on an existing task.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Update,
    Delete,
}

pub fn can_list_tasks(principal: &Principal) -> TaskListScope {
    TaskListScope {
        allow_all: principal.capability() == Capability::Administer,
    }
}

/// `requested_owner == None` means the task will be owned by the principal;
/// the handler performs that resolution.
pub fn can_create_task(principal: &Principal, requested_owner: Option<UserId>) -> AuthDecision {
    let capability = principal.capability();
    if capability == Capability::Observe {
        return AuthDecision::deny(DenyReason::RoleCannotCreateTasks);
    }

    match requested_owner {
        Some(owner) if owner != principal.id => AuthDecision::only_if(
            capability == Capability::Administer,
            DenyReason::OnlyAdminsAssignTasks,
        ),
        _ => AuthDecision::allow(),
    }
}

pub fn can_view_task(principal: &Principal, task_owner: UserId) -> AuthDecision {
    AuthDecision::only_if(
        principal.is_admin() || principal.id == task_owner,
        DenyReason::NotAuthorized,
    )
}

/// Role half of [`can_mutate_task`]: viewers are refused before the task is
/// even loaded.
pub fn can_attempt_task_mutation(principal: &Principal) -> AuthDecision {
    AuthDecision::only_if(
        principal.capability() != Capability::Observe,
        DenyReason::NotAuthorized,
    )
}

pub fn can_mutate_task(principal: &Principal, task_owner: UserId, _action: TaskAction) -> AuthDecision {
    match principal.capability() {
        Capability::Observe => can_attempt_task_mutation(principal),
        Capability::Administer => AuthDecision::allow(),
        Capability::Author => {
            AuthDecision::only_if(task_owner == principal.id, DenyReason::NotAuthorized)
        }
    }
}

/// Changing a task's owner is admin-only, whoever currently owns the task.
pub fn can_reassign_task(principal: &Principal) -> AuthDecision {
    AuthDecision::only_if(principal.is_admin(), DenyReason::OnlyAdminsReassignTasks)
}

pub fn can_list_users(principal: &Principal) -> AuthDecision {
    admin_only(principal)
}

pub fn can_view_user(principal: &Principal) -> AuthDecision {
    admin_only(principal)
}

pub fn can_update_user(principal: &Principal) -> AuthDecision {
    admin_only(principal)
}

/// Admin gate for user deletion that needs no target. Handlers run it before
/// parsing or loading the target.
pub fn can_attempt_user_deletion(principal: &Principal) -> AuthDecision {
    admin_only(principal)
}

/// Admin-only, and even an admin may not delete their own account.
pub fn can_delete_user(principal: &Principal, target: UserId) -> AuthDecision {
    let gate = can_attempt_user_deletion(principal);
    if !gate.allowed {
        return gate;
    }
    AuthDecision::only_if(target != principal.id, DenyReason::CannotDeleteSelf)
}

/// Role changes are a privileged sub-field of user update with their own
/// check point.
pub fn can_change_user_role(principal: &Principal) -> AuthDecision {
    admin_only(principal)
}

fn admin_only(principal: &Principal) -> AuthDecision {
    AuthDecision::only_if(principal.is_admin(), DenyReason::NotAuthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use proptest::prelude::*;

    const ME: UserId = UserId::new(10);
    const OTHER: UserId = UserId::new(20);

    fn admin() -> Principal {
        Principal::new(ME, [Role::Admin])
    }

    fn editor() -> Principal {
        Principal::new(ME, [Role::Editor])
    }

    fn viewer() -> Principal {
        Principal::new(ME, [Role::Viewer])
    }

    fn reason(d: AuthDecision) -> Option<String> {
        d.reason.map(|r| r.to_string())
    }

    #[test]
    fn viewer_is_denied_every_mutation_and_user_admin() {
        let p = viewer();
        let decisions = [
            can_create_task(&p, None),
            can_mutate_task(&p, ME, TaskAction::Update),
            can_mutate_task(&p, ME, TaskAction::Delete),
            can_list_users(&p),
            can_view_user(&p),
            can_update_user(&p),
            can_delete_user(&p, OTHER),
        ];
        assert!(decisions.iter().all(|d| !d.allowed));
        assert_eq!(
            reason(can_create_task(&p, None)).as_deref(),
            Some("role not permitted to create tasks")
        );
    }

    #[test]
    fn admin_lists_all_and_touches_any_task() {
        let p = admin();
        assert!(can_list_tasks(&p).allow_all);
        assert_eq!(can_list_tasks(&p).owner_filter(&p), None);
        assert!(can_view_task(&p, OTHER).allowed);
        assert!(can_mutate_task(&p, OTHER, TaskAction::Update).allowed);
        assert!(can_mutate_task(&p, OTHER, TaskAction::Delete).allowed);
    }

    #[test]
    fn non_admins_list_only_their_own_tasks() {
        for p in [editor(), viewer()] {
            let scope = can_list_tasks(&p);
            assert!(!scope.allow_all);
            assert_eq!(scope.owner_filter(&p), Some(ME));
        }
    }

    #[test]
    fn editor_mutates_only_own_tasks() {
        let p = editor();
        for action in [TaskAction::Update, TaskAction::Delete] {
            assert!(can_mutate_task(&p, ME, action).allowed);
            let denied = can_mutate_task(&p, OTHER, action);
            assert!(!denied.allowed);
            assert_eq!(reason(denied).as_deref(), Some("not authorized"));
        }
    }

    #[test]
    fn view_task_requires_admin_or_ownership() {
        assert!(can_view_task(&viewer(), ME).allowed);
        assert!(!can_view_task(&viewer(), OTHER).allowed);
        assert!(!can_view_task(&editor(), OTHER).allowed);
    }

    #[test]
    fn editor_create_owner_resolution() {
        let p = editor();
        assert!(can_create_task(&p, None).allowed);
        assert!(can_create_task(&p, Some(ME)).allowed);

        let denied = can_create_task(&p, Some(OTHER));
        assert!(!denied.allowed);
        assert_eq!(
            reason(denied).as_deref(),
            Some("only admins may assign tasks to other users")
        );
    }

    #[test]
    fn admin_may_create_for_anyone() {
        assert!(can_create_task(&admin(), Some(OTHER)).allowed);
    }

    #[test]
    fn reassignment_is_admin_only() {
        assert!(can_reassign_task(&admin()).allowed);
        let denied = can_reassign_task(&editor());
        assert_eq!(
            reason(denied).as_deref(),
            Some("only admins may change task assignment")
        );
    }

    #[test]
    fn self_deletion_is_refused_with_distinct_reason() {
        let p = admin();
        assert!(can_delete_user(&p, OTHER).allowed);
        assert!(can_attempt_user_deletion(&p).allowed);

        let denied = can_delete_user(&p, ME);
        assert_eq!(denied.reason, Some(DenyReason::CannotDeleteSelf));
        assert_ne!(reason(denied), reason(can_list_users(&viewer())));
    }

    #[test]
    fn non_admin_deleting_self_is_simply_not_authorized() {
        for p in [editor(), viewer()] {
            assert_eq!(can_delete_user(&p, ME).reason, Some(DenyReason::NotAuthorized));
            assert!(!can_attempt_user_deletion(&p).allowed);
        }
    }

    #[test]
    fn viewers_are_gated_before_any_task_is_loaded() {
        assert_eq!(
            can_attempt_task_mutation(&viewer()).reason,
            Some(DenyReason::NotAuthorized)
        );
        assert!(can_attempt_task_mutation(&editor()).allowed);
        assert!(can_attempt_task_mutation(&admin()).allowed);
    }

    #[test]
    fn role_change_follows_user_update() {
        assert!(can_change_user_role(&admin()).allowed);
        assert!(!can_change_user_role(&editor()).allowed);
    }

    #[test]
    fn into_result_carries_reason() {
        assert_eq!(AuthDecision::allow().into_result(), Ok(()));
        assert_eq!(
            can_reassign_task(&viewer()).into_result(),
            Err(DenyReason::OnlyAdminsReassignTasks)
        );
    }

    fn any_roles() -> impl Strategy<Value = Vec<Role>> {
        proptest::collection::vec(prop::sample::select(Role::ALL.to_vec()), 0..=3)
    }

    proptest! {
        #[test]
        fn decisions_are_idempotent(
            roles in any_roles(),
            me in 1i64..50,
            owner in 1i64..50,
            requested in proptest::option::of(1i64..50),
        ) {
            let p = Principal::new(UserId::new(me), roles);
            let owner = UserId::new(owner);
            let requested = requested.map(UserId::new);

            prop_assert_eq!(can_list_tasks(&p), can_list_tasks(&p));
            prop_assert_eq!(can_create_task(&p, requested), can_create_task(&p, requested));
            prop_assert_eq!(can_view_task(&p, owner), can_view_task(&p, owner));
            prop_assert_eq!(
                can_mutate_task(&p, owner, TaskAction::Update),
                can_mutate_task(&p, owner, TaskAction::Update)
            );
            prop_assert_eq!(can_delete_user(&p, owner), can_delete_user(&p, owner));
        }

        #[test]
        fn admin_role_overrides_ownership(
            extra in any_roles(),
            me in 1i64..50,
            owner in 1i64..50,
        ) {
            let p = Principal::new(UserId::new(me), extra.into_iter().chain([Role::Admin]));
            let owner = UserId::new(owner);

            prop_assert!(can_view_task(&p, owner).allowed);
            prop_assert!(can_mutate_task(&p, owner, TaskAction::Update).allowed);
            prop_assert!(can_mutate_task(&p, owner, TaskAction::Delete).allowed);
            prop_assert!(can_create_task(&p, Some(owner)).allowed);
        }

        #[test]
        fn self_deletion_always_denied(roles in any_roles(), me in 1i64..50) {
            let p = Principal::new(UserId::new(me), roles);
            let decision = can_delete_user(&p, p.id);
            prop_assert!(!decision.allowed);
            let expected = if p.roles.contains(&Role::Admin) {
                DenyReason::CannotDeleteSelf
            } else {
                DenyReason::NotAuthorized
            };
            prop_assert_eq!(decision.reason, Some(expected));
        }

        #[test]
        fn mutation_gate_agrees_with_full_check(
            roles in any_roles(),
            me in 1i64..50,
            owner in 1i64..50,
        ) {
            let p = Principal::new(UserId::new(me), roles);
            let full = can_mutate_task(&p, UserId::new(owner), TaskAction::Update);
            if !can_attempt_task_mutation(&p).allowed {
                prop_assert!(!full.allowed);
            }
        }

        #[test]
        fn denied_decisions_always_carry_a_reason(
            roles in any_roles(),
            me in 1i64..50,
            owner in 1i64..50,
        ) {
            let p = Principal::new(UserId::new(me), roles);
            let owner = UserId::new(owner);
            for d in [
                can_create_task(&p, Some(owner)),
                can_view_task(&p, owner),
                can_mutate_task(&p, owner, TaskAction::Delete),
                can_reassign_task(&p),
                can_update_user(&p),
                can_delete_user(&p, owner),
            ] {
                prop_assert_eq!(d.allowed, d.reason.is_none());
            }
        }
    }
}
