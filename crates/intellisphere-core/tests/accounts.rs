//! Account form handling in front of a stub backend.

use intellisphere_core::{AccountClient, ClientError, KeyValueStore, MemoryStore};
use intellisphere_protocol::{LoginRequest, SignupRequest};
use intellisphere_test_utils::{AccountCall, Failure, StubAccountService};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn client(service: StubAccountService) -> (AccountClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (
        AccountClient::new(Arc::new(service), store.clone()),
        store,
    )
}

#[tokio::test]
async fn invalid_signup_never_reaches_backend() {
    let service = StubAccountService::new();
    let (accounts, _) = client(service.clone());

    let err = accounts
        .signup("Ada", "ada@example.com", "short", "other")
        .await
        .unwrap_err();
    match err {
        ClientError::Validation(errors) => assert_eq!(
            errors,
            vec![
                "Password must have at least 8 characters".to_string(),
                "Passwords do not match".to_string(),
            ]
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn valid_signup_posts_form() {
    let service = StubAccountService::new();
    let (accounts, store) = client(service.clone());

    let message = accounts
        .signup("Ada", "ada@example.com", "longenough", "longenough")
        .await
        .expect("signup");
    assert_eq!(message, "Signup successful!");
    assert_eq!(
        service.calls(),
        vec![AccountCall::Signup(SignupRequest {
            firstname: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "longenough".to_string(),
        })]
    );
    assert_eq!(store.get("user").expect("get"), None);
}

#[tokio::test]
async fn login_records_user_and_logout_forgets_it() {
    let service = StubAccountService::new();
    let (accounts, store) = client(service.clone());

    accounts
        .login("ada@example.com", "pw")
        .await
        .expect("login");
    assert_eq!(store.get("user").expect("get").as_deref(), Some("ada@example.com"));

    accounts.logout().await.expect("logout");
    assert_eq!(store.get("user").expect("get"), None);
    assert_eq!(
        service.calls(),
        vec![
            AccountCall::Login(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
            }),
            AccountCall::Logout,
        ]
    );
}

#[tokio::test]
async fn rejected_login_records_nothing() {
    let (accounts, store) = client(StubAccountService::failing(Failure::service(
        "Invalid email or password.",
    )));
    let err = accounts.login("ada@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password.");
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn empty_login_form_lists_problems() {
    let (accounts, _) = client(StubAccountService::new());
    let err = accounts.login("", "").await.unwrap_err();
    assert_eq!(err.to_string(), "Email is required; Password is required");
}
