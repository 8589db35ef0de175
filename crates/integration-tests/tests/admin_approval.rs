//! Admin access requests and the main admin's decisions, end to end through
//! the wired services.

use fashion_hub_core::{Decision, Role};
use fashion_hub_integration_tests::{MAIN_ADMIN, PASSWORD, TestContext};
use fashion_hub_storefront::services::{Portal, ServiceError};

#[tokio::test]
async fn test_pending_admin_cannot_log_in_until_approved() {
    let ctx = TestContext::new();
    let main = ctx.main_admin().await;
    let bob = ctx.pending_admin("bob").await;

    let err = ctx
        .state
        .auth()
        .login(Portal::Admin, "bob", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PendingApproval));

    let pending = ctx.state.admin().list_pending(main.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, bob.id);

    let approved = ctx
        .state
        .admin()
        .decide(main.id, bob.id, Decision::Approved)
        .await
        .unwrap();
    assert_eq!(approved.role, Role::ApprovedAdmin);
    assert_eq!(approved.decided_by, Some(main.id));

    let outcome = ctx
        .state
        .auth()
        .login(Portal::Admin, "BOB", PASSWORD)
        .await
        .unwrap();
    assert_eq!(outcome.principal.id, bob.id);
    assert!(ctx.state.admin().list_pending(main.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revocation_takes_effect_on_live_session() {
    let ctx = TestContext::new();
    let main = ctx.main_admin().await;
    let bob = ctx.approved_admin(main.id, "bob").await;
    let session = ctx
        .state
        .auth()
        .login(Portal::Admin, "bob", PASSWORD)
        .await
        .unwrap()
        .session;

    assert!(ctx.state.orders().list_all(bob.id).await.is_ok());

    ctx.state
        .admin()
        .decide(main.id, bob.id, Decision::Rejected)
        .await
        .unwrap();

    // The token still resolves, but the role is re-read on every call.
    let resolved = ctx.state.authz().authenticate(&session.token).await.unwrap();
    assert_eq!(resolved.role, Role::RejectedAdmin);
    assert!(matches!(
        ctx.state.orders().list_all(bob.id).await,
        Err(ServiceError::PermissionDenied)
    ));
    assert!(matches!(
        ctx.state.auth().login(Portal::Admin, "bob", PASSWORD).await,
        Err(ServiceError::AccessRejected)
    ));
}

#[tokio::test]
async fn test_only_main_admin_decides_and_main_is_protected() {
    let ctx = TestContext::new();
    let main = ctx.main_admin().await;
    let alice = ctx.approved_admin(main.id, "alice").await;
    let carol = ctx.pending_admin("carol").await;

    assert!(matches!(
        ctx.state
            .admin()
            .decide(alice.id, carol.id, Decision::Approved)
            .await,
        Err(ServiceError::PermissionDenied)
    ));
    assert!(matches!(
        ctx.state
            .admin()
            .decide(alice.id, main.id, Decision::Rejected)
            .await,
        Err(ServiceError::ProtectedPrincipal)
    ));
    assert!(matches!(
        ctx.state
            .admin()
            .decide(main.id, main.id, Decision::Rejected)
            .await,
        Err(ServiceError::ProtectedPrincipal)
    ));
    assert!(matches!(
        ctx.state.admin().list_admins(alice.id).await,
        Err(ServiceError::PermissionDenied)
    ));

    let admins = ctx.state.admin().list_admins(main.id).await.unwrap();
    assert_eq!(admins.len(), 3);
}

#[tokio::test]
async fn test_customers_are_not_decision_targets() {
    let ctx = TestContext::new();
    let main = ctx.main_admin().await;
    let asha = ctx.customer("Asha", "asha@example.com").await;

    assert!(matches!(
        ctx.state
            .admin()
            .decide(main.id, asha.id, Decision::Approved)
            .await,
        Err(ServiceError::InvalidTarget)
    ));
}

#[tokio::test]
async fn test_portals_are_separate() {
    let ctx = TestContext::new();
    ctx.main_admin().await;
    ctx.customer("Asha", "asha@example.com").await;

    assert!(matches!(
        ctx.state
            .auth()
            .login(Portal::Storefront, MAIN_ADMIN, PASSWORD)
            .await,
        Err(ServiceError::InvalidCredential)
    ));
    assert!(matches!(
        ctx.state
            .auth()
            .login(Portal::Admin, "asha@example.com", PASSWORD)
            .await,
        Err(ServiceError::InvalidCredential)
    ));
    assert!(
        ctx.state
            .auth()
            .login(Portal::Admin, MAIN_ADMIN, PASSWORD)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_bootstrap_twice_keeps_one_main_admin() {
    let ctx = TestContext::new();
    let first = ctx.main_admin().await;
    let second = ctx.main_admin().await;
    assert_eq!(first.id, second.id);

    assert!(matches!(
        ctx.state
            .admin()
            .bootstrap_main("someone-else", None, PASSWORD)
            .await,
        Err(ServiceError::Conflict(_))
    ));
}
