//! Users, sessions and permissions.

mod common;

use tempfile::TempDir;
use till_store::till_core::{LineItem, Money, Operation, Product, Role, StoreSettings};
use till_store::{AuthError, ErrorCode, PolicyError, StoreError};

use common::*;

fn is_denied(err: &StoreError, operation: Operation) -> bool {
    matches!(err, StoreError::PermissionDenied { role: Role::Cashier, operation: op } if *op == operation)
}

#[tokio::test]
async fn test_login_with_bootstrap_admin() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let session = admin(&store).await;
    assert_eq!(store.sessions().current_role(&session).unwrap(), Role::Admin);
    assert_eq!(store.sessions().active_sessions(), 1);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let wrong = store.sessions().login(ADMIN, "nope").await.unwrap_err();
    let unknown = store.sessions().login("ghost", ADMIN_PW).await.unwrap_err();

    assert!(matches!(wrong, StoreError::Auth(AuthError::InvalidCredentials)));
    assert!(matches!(unknown, StoreError::Auth(AuthError::InvalidCredentials)));
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert_eq!(store.sessions().active_sessions(), 0);
}

#[tokio::test]
async fn test_credentials_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir).await;
        let admin = admin(&store).await;
        store
            .credentials()
            .create_user(&admin, "ana", "ana-secret", Role::Cashier)
            .await
            .unwrap();
    }

    let store = open(&dir).await;
    let session = store.sessions().login("ana", "ana-secret").await.unwrap();
    assert_eq!(store.sessions().current_role(&session).unwrap(), Role::Cashier);

    let raw = tokio::fs::read_to_string(&store.paths().credentials).await.unwrap();
    assert!(!raw.contains("ana-secret"));
}

#[tokio::test]
async fn test_logged_out_session_is_inactive() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let session = admin(&store).await;

    store.sessions().logout(&session);
    store.sessions().logout(&session);

    let err = store.catalog().list_products(&session).await.unwrap_err();
    assert!(matches!(err, StoreError::Auth(AuthError::SessionNotActive)));
    assert_eq!(err.code(), ErrorCode::SessionNotActive);
    assert!(store.sessions().current_role(&session).is_err());
}

#[tokio::test]
async fn test_cashier_is_denied_admin_operations() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let admin = admin(&store).await;
    stock_product(&store, &admin, "0001", 500, 10).await;
    let cashier = user(&store, &admin, "ana", Role::Cashier).await;
    let before = snapshot(&store).await;

    let err = store
        .catalog()
        .upsert_product(&cashier, Product::new("0002", "Rice", Money::from_cents(100), 5))
        .await
        .unwrap_err();
    assert!(is_denied(&err, Operation::ManageProducts));
    assert_eq!(err.code(), ErrorCode::PermissionDenied);

    let err = store.catalog().delete_product(&cashier, "0001").await.unwrap_err();
    assert!(is_denied(&err, Operation::ManageProducts));

    let err = store
        .credentials()
        .create_user(&cashier, "bob", "bob-pw", Role::Admin)
        .await
        .unwrap_err();
    assert!(is_denied(&err, Operation::ManageUsers));

    let err = store.credentials().list_users(&cashier).await.unwrap_err();
    assert!(is_denied(&err, Operation::ManageUsers));

    let err = store.ledger().sales_records(&cashier).await.unwrap_err();
    assert!(is_denied(&err, Operation::ViewReports));

    let err = store
        .settings()
        .save(&cashier, StoreSettings::default())
        .await
        .unwrap_err();
    assert!(is_denied(&err, Operation::EditSettings));

    assert_eq!(snapshot(&store).await, before);
    assert!(!store.paths().settings.exists());

    // What a cashier may do.
    store.catalog().get_product(&cashier, "0001").await.unwrap();
    store
        .catalog()
        .search_products(&cashier, "product", 10)
        .await
        .unwrap();
    store
        .sales()
        .process_sale(&cashier, &[LineItem::new("0001", 1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_self_deletion_and_revocation() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let root = admin(&store).await;
    let ana = user(&store, &root, "ana", Role::Cashier).await;

    let err = store.credentials().delete_user(&root, ADMIN).await.unwrap_err();
    assert!(matches!(err, StoreError::Policy(PolicyError::SelfDeletion(_))));

    store.credentials().delete_user(&root, "ana").await.unwrap();
    let err = store.catalog().list_products(&ana).await.unwrap_err();
    assert!(matches!(err, StoreError::Auth(AuthError::SessionNotActive)));

    let err = store.credentials().delete_user(&root, "ghost").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let users = store.credentials().list_users(&root).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].role, Role::Admin);
}

#[tokio::test]
async fn test_second_admin_can_delete_the_first() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let root = admin(&store).await;
    let second = user(&store, &root, "admin2", Role::Admin).await;

    store.credentials().delete_user(&second, ADMIN).await.unwrap();

    assert!(store.sessions().current_role(&root).is_err());
    let err = store.credentials().delete_user(&second, "admin2").await.unwrap_err();
    assert!(matches!(err, StoreError::Policy(PolicyError::SelfDeletion(_))));

    let err = store.sessions().login(ADMIN, ADMIN_PW).await.unwrap_err();
    assert!(matches!(err, StoreError::Auth(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_last_admin_cannot_be_deleted() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let root = admin(&store).await;
    let second = user(&store, &root, "admin2", Role::Admin).await;

    // Demote admin2 by hand. Their live session still passes the admin
    // permission check, but the guard counts admins in the file.
    let path = store.paths().credentials.clone();
    let edited = tokio::fs::read_to_string(&path)
        .await
        .unwrap()
        .replace("\nadmin2,admin,", "\nadmin2,cashier,");
    tokio::fs::write(&path, edited).await.unwrap();

    let err = store.credentials().delete_user(&second, ADMIN).await.unwrap_err();
    assert!(matches!(err, StoreError::Policy(PolicyError::LastAdmin(ref name)) if name == ADMIN));
    assert_eq!(err.code(), ErrorCode::PolicyViolation);

    assert_eq!(store.sessions().current_role(&root).unwrap(), Role::Admin);
    store.sessions().login(ADMIN, ADMIN_PW).await.unwrap();
}

#[tokio::test]
async fn test_deletion_revokes_sessions_on_every_handle() {
    let dir = TempDir::new().unwrap();
    let first = open(&dir).await;
    let root = admin(&first).await;
    user(&first, &root, "admin2", Role::Admin).await;

    let second = open(&dir).await;
    let other = second.sessions().login("admin2", "admin2-pw").await.unwrap();
    assert_eq!(first.sessions().current_role(&other).unwrap(), Role::Admin);

    second.credentials().delete_user(&other, ADMIN).await.unwrap();

    let err = first
        .credentials()
        .create_user(&root, "ghost", "ghost-pw", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Auth(AuthError::SessionNotActive)));
    assert!(first.sessions().current_role(&root).is_err());

    first.sessions().logout(&other);
    let err = second.credentials().list_users(&other).await.unwrap_err();
    assert!(matches!(err, StoreError::Auth(AuthError::SessionNotActive)));
    assert_eq!(second.sessions().active_sessions(), 0);
}

#[tokio::test]
async fn test_duplicate_and_invalid_users_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let root = admin(&store).await;
    let credentials = store.credentials();

    let err = credentials
        .create_user(&root, ADMIN, "another-pw", Role::Cashier)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    for (name, password) in [("", "long-enough"), ("has space", "long-enough"), ("bob", "abc")] {
        let err = credentials
            .create_user(&root, name, password, Role::Cashier)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError, "{name:?}");
    }
}

#[tokio::test]
async fn test_users_may_change_their_own_password() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let root = admin(&store).await;
    let ana = user(&store, &root, "ana", Role::Cashier).await;
    user(&store, &root, "bob", Role::Cashier).await;

    store
        .credentials()
        .change_password(&ana, "ana", "fresh-pw")
        .await
        .unwrap();
    let err = store
        .credentials()
        .change_password(&ana, "bob", "stolen-pw")
        .await
        .unwrap_err();
    assert!(is_denied(&err, Operation::ManageUsers));

    store
        .credentials()
        .change_password(&root, "bob", "reset-pw")
        .await
        .unwrap();

    store.sessions().login("ana", "fresh-pw").await.unwrap();
    store.sessions().login("bob", "reset-pw").await.unwrap();
    assert!(store.sessions().login("ana", "ana-pw").await.is_err());
}
