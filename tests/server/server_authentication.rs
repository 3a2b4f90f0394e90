#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use dimse::{status, uids, DimseError, UserIdentity};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pacs_archive::authentication::{AuthenticatorCsv, AuthenticatorJwt};
use serde::Serialize;

use common::{connect, start_server, RunningServer};

fn credentials(username: &str, password: &str) -> UserIdentity {
    UserIdentity::UsernamePassword {
        username: username.into(),
        password: password.into(),
    }
}

async fn stop(running: RunningServer) {
    running.server.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());
}

fn assert_rejected(result: dimse::Result<dimse::DimseScu>) {
    match result {
        Err(DimseError::AssociationRejected(reason)) => assert_eq!(reason, "Invalid credentials"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("association accepted"),
    }
}

#[tokio::test]
async fn test_credentials_file() {
    let fixture = common::sample_archive().await;
    let authenticator = AuthenticatorCsv::parse("# users\necho letmein\nall hunter2\n");
    let running = start_server(
        fixture.archive.clone(),
        Arc::new(authenticator),
        common::AE_TITLE,
    )
    .await;

    assert_rejected(connect(running.port, credentials("echo", "wrong"), &[uids::VERIFICATION]).await);
    assert_rejected(connect(running.port, credentials("mallory", "letmein"), &[uids::VERIFICATION]).await);
    assert_rejected(connect(running.port, common::user("echo"), &[uids::VERIFICATION]).await);
    assert_rejected(connect(running.port, UserIdentity::None, &[uids::VERIFICATION]).await);

    // Rejections do not stop the server
    let mut scu = connect(running.port, credentials("echo", "letmein"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::SUCCESS);
    scu.release().await.unwrap();

    stop(running).await;
}

#[tokio::test]
async fn test_principal_drives_access_control() {
    let fixture = common::sample_archive().await;
    let authenticator = AuthenticatorCsv::parse("echo a\nstore b\n");
    let running = start_server(
        fixture.archive.clone(),
        Arc::new(authenticator),
        common::AE_TITLE,
    )
    .await;

    let mut scu = connect(running.port, credentials("store", "b"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::PROCESSING_FAILURE);
    scu.release().await.unwrap();

    stop(running).await;
}

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: u64,
}

fn token(secret: &str, sub: &str) -> UserIdentity {
    let token = encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub,
            exp: 4_102_444_800,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();
    UserIdentity::Jwt { token }
}

#[tokio::test]
async fn test_bearer_tokens() {
    let fixture = common::sample_archive().await;
    let running = start_server(
        fixture.archive.clone(),
        Arc::new(AuthenticatorJwt::with_secret("s3cret")),
        common::AE_TITLE,
    )
    .await;

    assert_rejected(connect(running.port, token("forged", "echo"), &[uids::VERIFICATION]).await);
    assert_rejected(connect(running.port, credentials("echo", "s3cret"), &[uids::VERIFICATION]).await);

    let mut scu = connect(running.port, token("s3cret", "echo"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::SUCCESS);
    scu.release().await.unwrap();

    stop(running).await;
}
