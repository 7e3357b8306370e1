//! Permission policies.
//!
//! Each endpoint group names exactly one policy. Handlers evaluate the
//! collection-level check for every request and, once a target object is
//! resolved, additionally the object-level check — in that order, both
//! required to pass. Policies are pure predicates; translating a denial
//! into 401/403 happens in [`enforce`] / [`enforce_object`].
//!
//! Role and ownership questions are only ever asked of an authenticated
//! identity: [`Requester`] makes the user value unreachable in the
//! anonymous case, so no check can observe role fields before
//! authentication is established.

use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::user::User;

/// HTTP verb as seen by the permission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Safe verbs never mutate state and are readable without credentials
    /// under the read-only policies.
    pub fn is_safe(self) -> bool {
        matches!(self, Verb::Get | Verb::Head | Verb::Options)
    }
}

/// The identity attached to an inbound request after bearer resolution.
#[derive(Debug, Clone)]
pub enum Requester {
    Anonymous,
    Authenticated(User),
}

impl Requester {
    pub fn user(&self) -> Option<&User> {
        match self {
            Requester::Anonymous => None,
            Requester::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Requester::Authenticated(_))
    }

    /// The authenticated user, or an `Unauthorized` failure.
    pub fn authenticated(&self) -> Result<&User> {
        self.user().ok_or_else(|| {
            CoreError::Unauthorized("authentication required".to_string())
        })
    }

    fn owns(&self, owner: Option<Uuid>) -> bool {
        match (self.user(), owner) {
            (Some(user), Some(owner)) => user.id == owner,
            _ => false,
        }
    }
}

/// A permission predicate pair. `owner` in the object-level check is the
/// target's author, or `None` for system-owned objects (titles,
/// categories, genres).
pub trait Policy {
    /// Collection-level check, evaluated before any target is resolved.
    fn permits(&self, requester: &Requester, verb: Verb) -> bool;

    /// Object-level check against a resolved target. Defaults to the
    /// collection-level answer for policies without an ownership concept.
    fn permits_object(
        &self,
        requester: &Requester,
        verb: Verb,
        owner: Option<Uuid>,
    ) -> bool {
        let _ = owner;
        self.permits(requester, verb)
    }
}

/// Full access for authenticated admins and for superusers, any verb.
/// Gates the user-management surface.
pub struct AdminOrSuperuser;

impl Policy for AdminOrSuperuser {
    fn permits(&self, requester: &Requester, _verb: Verb) -> bool {
        requester
            .user()
            .is_some_and(|u| u.is_admin() || u.is_superuser)
    }
}

/// Anyone may read; only an authenticated admin may write. No ownership
/// concept — gates categories, genres and titles.
pub struct AdminOrReadOnly;

impl Policy for AdminOrReadOnly {
    fn permits(&self, requester: &Requester, verb: Verb) -> bool {
        verb.is_safe() || requester.user().is_some_and(User::is_admin)
    }
}

/// Anyone may read; writes require authentication. Object-level writes are
/// owner-or-admin, except deletion, which moderators (and superusers) may
/// also perform.
///
/// The delete/update asymmetry — a moderator may delete another user's
/// review or comment but may not update it — is deliberate and must not be
/// "fixed" here.
pub struct AdminModeratorOwnerOrReadOnly;

impl Policy for AdminModeratorOwnerOrReadOnly {
    fn permits(&self, requester: &Requester, verb: Verb) -> bool {
        requester.is_authenticated() || verb.is_safe()
    }

    fn permits_object(
        &self,
        requester: &Requester,
        verb: Verb,
        owner: Option<Uuid>,
    ) -> bool {
        if verb == Verb::Delete {
            return requester.owns(owner)
                || requester
                    .user()
                    .is_some_and(|u| u.is_admin() || u.is_moderator() || u.is_superuser);
        }
        verb.is_safe()
            || requester.owns(owner)
            || requester.user().is_some_and(User::is_admin)
    }
}

/// Authentication required for any access; object-level access for the
/// owner or an admin. Not wired to an endpoint — kept as a reusable
/// building block for owner-only surfaces.
pub struct AdminModeratorOwner;

impl Policy for AdminModeratorOwner {
    fn permits(&self, requester: &Requester, _verb: Verb) -> bool {
        requester.is_authenticated()
    }

    fn permits_object(
        &self,
        requester: &Requester,
        _verb: Verb,
        owner: Option<Uuid>,
    ) -> bool {
        requester.owns(owner) || requester.user().is_some_and(User::is_admin)
    }
}

fn denied(requester: &Requester) -> CoreError {
    match requester {
        Requester::Anonymous => {
            CoreError::Unauthorized("authentication required".to_string())
        }
        Requester::Authenticated(_) => CoreError::Forbidden(
            "you do not have permission to perform this action".to_string(),
        ),
    }
}

/// Run the collection-level check.
pub fn enforce(policy: &dyn Policy, requester: &Requester, verb: Verb) -> Result<()> {
    if policy.permits(requester, verb) {
        Ok(())
    } else {
        Err(denied(requester))
    }
}

/// Run the collection-level check, then the object-level check. Both must
/// pass; evaluation order is part of the contract.
pub fn enforce_object(
    policy: &dyn Policy,
    requester: &Requester,
    verb: Verb,
    owner: Option<Uuid>,
) -> Result<()> {
    if !policy.permits(requester, verb) {
        return Err(denied(requester));
    }
    if !policy.permits_object(requester, verb, owner) {
        return Err(denied(requester));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::role::Role;

    fn user_with(role: Role, is_superuser: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: format!("{role}-account"),
            email: format!("{role}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            is_superuser,
            created_at: now,
            updated_at: now,
        }
    }

    fn authenticated(role: Role) -> Requester {
        Requester::Authenticated(user_with(role, false))
    }

    fn superuser() -> Requester {
        Requester::Authenticated(user_with(Role::User, true))
    }

    #[test]
    fn admin_or_superuser_gates_everyone_else() {
        let policy = AdminOrSuperuser;
        assert!(policy.permits(&authenticated(Role::Admin), Verb::Get));
        assert!(policy.permits(&superuser(), Verb::Delete));
        assert!(!policy.permits(&authenticated(Role::Moderator), Verb::Get));
        assert!(!policy.permits(&authenticated(Role::User), Verb::Get));
        assert!(!policy.permits(&Requester::Anonymous, Verb::Get));
    }

    #[test]
    fn admin_or_read_only_lets_anyone_read() {
        let policy = AdminOrReadOnly;
        assert!(policy.permits(&Requester::Anonymous, Verb::Get));
        assert!(policy.permits(&authenticated(Role::User), Verb::Head));
        assert!(!policy.permits(&Requester::Anonymous, Verb::Post));
        assert!(!policy.permits(&authenticated(Role::User), Verb::Post));
        // No superuser carve-out on this policy.
        assert!(!policy.permits(&superuser(), Verb::Post));
        assert!(policy.permits(&authenticated(Role::Admin), Verb::Delete));
    }

    #[test]
    fn moderator_may_delete_but_not_update_anothers_object() {
        let policy = AdminModeratorOwnerOrReadOnly;
        let moderator = authenticated(Role::Moderator);
        let other = Uuid::new_v4();

        assert!(policy.permits_object(&moderator, Verb::Delete, Some(other)));
        assert!(!policy.permits_object(&moderator, Verb::Patch, Some(other)));
        assert!(!policy.permits_object(&moderator, Verb::Put, Some(other)));
    }

    #[test]
    fn owner_may_update_and_delete_own_object() {
        let policy = AdminModeratorOwnerOrReadOnly;
        let owner = authenticated(Role::User);
        let owner_id = owner.user().unwrap().id;

        assert!(policy.permits_object(&owner, Verb::Patch, Some(owner_id)));
        assert!(policy.permits_object(&owner, Verb::Delete, Some(owner_id)));
        assert!(!policy.permits_object(&owner, Verb::Patch, Some(Uuid::new_v4())));
    }

    #[test]
    fn admin_and_superuser_object_writes() {
        let policy = AdminModeratorOwnerOrReadOnly;
        let other = Uuid::new_v4();

        assert!(policy.permits_object(&authenticated(Role::Admin), Verb::Patch, Some(other)));
        assert!(policy.permits_object(&authenticated(Role::Admin), Verb::Delete, Some(other)));
        // A superuser without the admin role may delete but not update,
        // same as a moderator.
        assert!(policy.permits_object(&superuser(), Verb::Delete, Some(other)));
        assert!(!policy.permits_object(&superuser(), Verb::Patch, Some(other)));
    }

    #[test]
    fn reads_are_open_at_object_level() {
        let policy = AdminModeratorOwnerOrReadOnly;
        assert!(policy.permits_object(&Requester::Anonymous, Verb::Get, Some(Uuid::new_v4())));
        assert!(policy.permits(&Requester::Anonymous, Verb::Get));
        assert!(!policy.permits(&Requester::Anonymous, Verb::Post));
    }

    #[test]
    fn admin_moderator_owner_requires_authentication_throughout() {
        let policy = AdminModeratorOwner;
        let other = Uuid::new_v4();

        assert!(!policy.permits(&Requester::Anonymous, Verb::Get));
        assert!(policy.permits(&authenticated(Role::User), Verb::Get));
        // No read-only carve-out and no moderator carve-out at object level.
        assert!(!policy.permits_object(&authenticated(Role::Moderator), Verb::Get, Some(other)));
        assert!(policy.permits_object(&authenticated(Role::Admin), Verb::Get, Some(other)));

        let owner = authenticated(Role::User);
        let owner_id = owner.user().unwrap().id;
        assert!(policy.permits_object(&owner, Verb::Delete, Some(owner_id)));
    }

    #[test]
    fn enforce_object_runs_collection_check_first() {
        // An anonymous DELETE against AdminModeratorOwnerOrReadOnly fails
        // the collection check before ownership is ever considered.
        let result = enforce_object(
            &AdminModeratorOwnerOrReadOnly,
            &Requester::Anonymous,
            Verb::Delete,
            None,
        );
        assert!(matches!(result, Err(CoreError::Unauthorized(_))));
    }

    #[test]
    fn denial_distinguishes_anonymous_from_authenticated() {
        let anon = enforce(&AdminOrSuperuser, &Requester::Anonymous, Verb::Get);
        assert!(matches!(anon, Err(CoreError::Unauthorized(_))));

        let user = enforce(&AdminOrSuperuser, &authenticated(Role::User), Verb::Get);
        assert!(matches!(user, Err(CoreError::Forbidden(_))));
    }

    #[test]
    fn system_owned_objects_have_no_owner() {
        let policy = AdminOrReadOnly;
        // Object check mirrors the collection check; owner is irrelevant.
        assert!(policy.permits_object(&Requester::Anonymous, Verb::Get, None));
        assert!(!policy.permits_object(&authenticated(Role::Moderator), Verb::Delete, None));
        assert!(policy.permits_object(&authenticated(Role::Admin), Verb::Delete, None));
    }
}
