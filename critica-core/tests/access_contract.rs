//! Contract tests for the permission layer as the handlers consume it:
//! one policy per endpoint group, collection check before object check,
//! denial mapped to unauthorized/forbidden by requester kind.

use chrono::Utc;
use critica_core::CoreError;
use critica_core::access::{
    AdminModeratorOwnerOrReadOnly, AdminOrReadOnly, AdminOrSuperuser, Policy,
    Requester, Verb, enforce, enforce_object,
};
use critica_core::role::Role;
use critica_core::user::User;
use uuid::Uuid;

fn account(role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: format!("{role}1"),
        email: format!("{role}1@example.com"),
        first_name: String::new(),
        last_name: String::new(),
        bio: String::new(),
        role,
        is_superuser: false,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn review_surface_moderator_asymmetry() {
    // The property the review endpoints rely on: a moderator may DELETE
    // another user's review but a PATCH or PUT against it is forbidden.
    let policy = AdminModeratorOwnerOrReadOnly;
    let moderator = Requester::Authenticated(account(Role::Moderator));
    let foreign_author = Some(Uuid::new_v4());

    assert!(enforce_object(&policy, &moderator, Verb::Delete, foreign_author).is_ok());

    for verb in [Verb::Patch, Verb::Put] {
        let denied = enforce_object(&policy, &moderator, verb, foreign_author);
        assert!(matches!(denied, Err(CoreError::Forbidden(_))), "{verb:?}");
    }
}

#[test]
fn anonymous_reads_pass_both_checks() {
    let policy = AdminModeratorOwnerOrReadOnly;
    let anon = Requester::Anonymous;
    let owner = Some(Uuid::new_v4());

    assert!(enforce(&policy, &anon, Verb::Get).is_ok());
    assert!(enforce_object(&policy, &anon, Verb::Get, owner).is_ok());
}

#[test]
fn anonymous_writes_fail_at_the_collection_check() {
    // The object-level branch for DELETE would consult ownership; an
    // anonymous requester must be stopped before that branch is reached.
    let policy = AdminModeratorOwnerOrReadOnly;
    let anon = Requester::Anonymous;

    for verb in [Verb::Post, Verb::Patch, Verb::Delete] {
        assert!(!policy.permits(&anon, verb), "{verb:?}");
        let denied = enforce_object(&policy, &anon, verb, None);
        assert!(matches!(denied, Err(CoreError::Unauthorized(_))), "{verb:?}");
    }
}

#[test]
fn catalog_surface_is_admin_write_only() {
    let policy = AdminOrReadOnly;
    let cases: [(Requester, bool); 4] = [
        (Requester::Anonymous, false),
        (Requester::Authenticated(account(Role::User)), false),
        (Requester::Authenticated(account(Role::Moderator)), false),
        (Requester::Authenticated(account(Role::Admin)), true),
    ];

    for (requester, may_write) in cases {
        assert!(enforce(&policy, &requester, Verb::Get).is_ok());
        assert_eq!(
            enforce(&policy, &requester, Verb::Post).is_ok(),
            may_write,
            "{requester:?}"
        );
        assert_eq!(
            enforce_object(&policy, &requester, Verb::Delete, None).is_ok(),
            may_write,
            "{requester:?}"
        );
    }
}

#[test]
fn user_management_surface_ignores_verb() {
    let policy = AdminOrSuperuser;
    let admin = Requester::Authenticated(account(Role::Admin));
    let mut elevated = account(Role::User);
    elevated.is_superuser = true;
    let superuser = Requester::Authenticated(elevated);
    let plain = Requester::Authenticated(account(Role::User));

    for verb in [Verb::Get, Verb::Post, Verb::Patch, Verb::Delete] {
        assert!(enforce(&policy, &admin, verb).is_ok());
        assert!(enforce(&policy, &superuser, verb).is_ok());
        assert!(enforce(&policy, &plain, verb).is_err());
        assert!(enforce(&policy, &Requester::Anonymous, verb).is_err());
    }
}
