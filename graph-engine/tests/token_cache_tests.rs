mod common;

use common::{Harness, TOKEN_PATH, TokenSequence};
use futures::future::join_all;
use graph_engine::{GraphError, TokenError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_second_call_within_validity_reuses_token() {
    let harness = Harness::start().await;
    let tokens = harness.mount_tokens(3599).await;
    let cache = harness.client.tokens();

    let first = cache.get_token(&harness.tenant).await.unwrap();
    let second = cache.get_token(&harness.tenant).await.unwrap();

    assert_eq!(tokens.issued(), 1);
    assert_eq!(first.bearer_value, "token-1");
    assert_eq!(second.bearer_value, "token-1");
}

#[tokio::test]
async fn test_token_is_reacquired_once_past_safety_margin() {
    // 3s lifetime with a 2s margin leaves the token servable for 1s
    let harness = Harness::with_margin(Duration::from_secs(2)).await;
    let tokens = harness.mount_tokens(3).await;
    let cache = harness.client.tokens();

    cache.get_token(&harness.tenant).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let refreshed = cache.get_token(&harness.tenant).await.unwrap();
    assert_eq!(refreshed.bearer_value, "token-2");
    assert_eq!(tokens.issued(), 2);

    let again = cache.get_token(&harness.tenant).await.unwrap();
    assert_eq!(again.bearer_value, "token-2");
    assert_eq!(tokens.issued(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_acquisition() {
    let harness = Harness::start().await;
    let tokens = TokenSequence::new(3599).with_delay(Duration::from_millis(300));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(tokens.clone())
        .expect(1)
        .mount(&harness.server)
        .await;

    let cache = harness.client.tokens();
    let results = join_all((0..10).map(|_| cache.get_token(&harness.tenant))).await;

    assert_eq!(tokens.issued(), 1);
    for result in results {
        assert_eq!(result.unwrap().bearer_value, "token-1");
    }
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_authentication_error() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let err = harness
        .client
        .call(&harness.tenant, &graph_engine::GraphRequest::get("/users"))
        .await
        .unwrap_err();

    match err {
        GraphError::Authentication(token_error) => match token_error.as_ref() {
            TokenError::Rejected { code, .. } => assert_eq!(code, "invalid_client"),
            other => panic!("unexpected token error: {other:?}"),
        },
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.graph_requests("GET").await, 0);
}

#[tokio::test]
async fn test_failed_acquisition_does_not_serve_stale_token() {
    let harness = Harness::with_margin(Duration::from_secs(2)).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "expires_in": 3,
            "token_type": "Bearer"
        })))
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "unauthorized_client",
            "error_description": "AADSTS700016: Application not found in the directory."
        })))
        .mount(&harness.server)
        .await;

    let cache = harness.client.tokens();
    cache.get_token(&harness.tenant).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(cache.get_token(&harness.tenant).await.is_err());
    assert!(!cache.contains(common::TENANT_ID));
}
