//! Tests for the HTTP certificate source
//!
//! Tests cover:
//! - ETag comparison on HEAD
//! - Missing ETag handling
//! - Non-success HEAD/GET responses
//! - Request timeouts on HEAD and GET

mod common;

use common::*;
use ohmycert_core::{CertSource, Error, HttpCertSource};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_check_matching_etag_is_unchanged() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mock_certificate(&server, "example.com", "\"abc123\"", 0).await;

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();
    let check = source
        .check_changed("example.com", Some("\"abc123\""))
        .await
        .unwrap();

    assert!(!check.changed);
    assert_eq!(check.fingerprint.as_deref(), Some("\"abc123\""));
}

#[tokio::test]
async fn test_check_different_etag_is_changed() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mock_certificate(&server, "example.com", "\"new\"", 0).await;

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();
    let check = source
        .check_changed("example.com", Some("\"old\""))
        .await
        .unwrap();

    assert!(check.changed);
    assert_eq!(check.fingerprint.as_deref(), Some("\"new\""));
}

#[tokio::test]
async fn test_check_without_etag_is_changed() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mock_certificate_without_etag(&server, "example.com").await;

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();
    let check = source
        .check_changed("example.com", Some("\"abc123\""))
        .await
        .unwrap();

    assert!(check.changed);
    assert!(check.fingerprint.is_none());
}

#[tokio::test]
async fn test_check_not_found_is_check_failure() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mock_status(&server, "HEAD", "missing.crt", 404).await;

    let source = HttpCertSource::new(&workspace.config(&server, &["missing"])).unwrap();
    let err = source.check_changed("missing", None).await.unwrap_err();

    assert!(matches!(err, Error::CheckFailure { ref name, .. } if name == "missing"));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_check_timeout_is_check_failure() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    Mock::given(method("HEAD"))
        .and(path(format!("{}slow.crt", BUCKET_PREFIX)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"e1\"")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let source = HttpCertSource::new(&workspace.config(&server, &["slow"])).unwrap();
    let err = source.check_changed("slow", None).await.unwrap_err();

    assert!(matches!(err, Error::CheckFailure { .. }));
}

#[tokio::test]
async fn test_retrieve_returns_both_files() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mock_certificate(&server, "example.com", "\"e1\"", 1).await;

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();
    let material = source.retrieve("example.com").await.unwrap();

    assert_eq!(material.cert, cert_body("example.com", "\"e1\"").into_bytes());
    assert_eq!(material.key, key_body("example.com", "\"e1\"").into_bytes());
}

#[tokio::test]
async fn test_retrieve_fails_when_key_missing() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    Mock::given(method("GET"))
        .and(path(format!("{}example.com.crt", BUCKET_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CERT"))
        .mount(&server)
        .await;
    mock_status(&server, "GET", "example.com.key", 403).await;

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();
    let err = source.retrieve("example.com").await.unwrap_err();

    assert!(matches!(err, Error::FetchFailure { .. }));
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_retrieve_timeout_is_fetch_failure() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    Mock::given(method("GET"))
        .and(path(format!("{}slow.crt", BUCKET_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CERT"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}slow.key", BUCKET_PREFIX)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("KEY")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let source = HttpCertSource::new(&workspace.config(&server, &["slow"])).unwrap();
    let err = source.retrieve("slow").await.unwrap_err();

    assert!(matches!(err, Error::FetchFailure { ref name, .. } if name == "slow"));
}

#[tokio::test]
async fn test_describe_points_at_certificate_object() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    let source = HttpCertSource::new(&workspace.config(&server, &["example.com"])).unwrap();

    assert_eq!(
        source.describe("example.com"),
        format!("{}/certs/example.com.crt", server.uri())
    );
}
