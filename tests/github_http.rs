//! HTTP tests for the GitHub commit comparator.
//!
//! A `wiremock` server stands in for the GitHub REST API.

use bufpush::core::types::Secret;
use bufpush::forge::github::GitHubComparator;
use bufpush::forge::{CommitComparator, CompareStatus, ForgeError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const HEAD: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn compare_path() -> String {
    format!("/repos/octocat/hello-world/compare/{}...{}", BASE, HEAD)
}

fn comparator(server: &MockServer) -> GitHubComparator {
    GitHubComparator::with_api_base(
        Secret::new("ghs_test"),
        "octocat",
        "hello-world",
        server.uri(),
    )
}

async fn respond_with(template: ResponseTemplate) -> (MockServer, GitHubComparator) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(compare_path()))
        .respond_with(template)
        .mount(&server)
        .await;
    let forge = comparator(&server);
    (server, forge)
}

#[tokio::test]
async fn parses_every_known_status() {
    for status in CompareStatus::ALL {
        let (_server, forge) = respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": status.as_str(),
                "ahead_by": 1,
                "behind_by": 0,
                "commits": [],
            })),
        )
        .await;
        assert_eq!(forge.compare_commits(BASE, HEAD).await.unwrap(), status);
    }
}

#[tokio::test]
async fn sends_auth_and_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(compare_path()))
        .and(query_param("per_page", "1"))
        .and(header("authorization", "Bearer ghs_test"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("user-agent", "buf-push-action"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ahead"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let status = comparator(&server).compare_commits(BASE, HEAD).await.unwrap();
    assert_eq!(status, CompareStatus::Ahead);
}

#[tokio::test]
async fn not_found_is_distinguishable() {
    let (_server, forge) = respond_with(
        ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "No common ancestor between a and b.",
        })),
    )
    .await;
    assert!(matches!(
        forge.compare_commits(BASE, HEAD).await,
        Err(ForgeError::NotFound(_))
    ));
}

#[tokio::test]
async fn unknown_status_is_unexpected() {
    let (_server, forge) = respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "sideways"})),
    )
    .await;
    let err = forge.compare_commits(BASE, HEAD).await.unwrap_err();
    assert_eq!(err, ForgeError::UnexpectedStatus("sideways".into()));
    assert_eq!(err.to_string(), "unexpected status: sideways");
}

#[tokio::test]
async fn auth_and_rate_limit_errors() {
    let (_server, forge) = respond_with(ResponseTemplate::new(401)).await;
    assert!(matches!(
        forge.compare_commits(BASE, HEAD).await,
        Err(ForgeError::AuthFailed(_))
    ));

    let (_server, forge) = respond_with(
        ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "API rate limit exceeded for installation ID 1.",
        })),
    )
    .await;
    assert_eq!(
        forge.compare_commits(BASE, HEAD).await,
        Err(ForgeError::RateLimited)
    );
}

#[tokio::test]
async fn server_errors_carry_status() {
    let (_server, forge) = respond_with(
        ResponseTemplate::new(502).set_body_json(serde_json::json!({"message": "bad gateway"})),
    )
    .await;
    match forge.compare_commits(BASE, HEAD).await {
        Err(ForgeError::ApiError { status, .. }) => assert_eq!(status, 502),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let forge = GitHubComparator::with_api_base(
        Secret::new("t"),
        "octocat",
        "hello-world",
        "http://127.0.0.1:9",
    );
    assert!(matches!(
        forge.compare_commits(BASE, HEAD).await,
        Err(ForgeError::NetworkError(_))
    ));
}
