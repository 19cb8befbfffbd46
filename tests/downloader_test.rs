//! Downloader validation tests: status handling, content-type and
//! empty-body rejection against a mock image host.

use tapet::downloader::{sha256_hex, ImageDownloader};
use tapet::error::{DownloadError, ErrorClass};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader() -> ImageDownloader {
    ImageDownloader::new(reqwest::Client::new(), 1000)
}

#[tokio::test]
async fn downloads_image_bytes() {
    let server = MockServer::start().await;
    let body = b"\xff\xd8\xff\xe0 fake jpeg".to_vec();
    Mock::given(method("GET"))
        .and(path("/wall.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "image/jpeg"))
        .mount(&server)
        .await;

    let bytes = downloader()
        .fetch(&format!("{}/wall.jpg", server.uri()))
        .await
        .expect("fetch");

    assert_eq!(bytes.as_ref(), body.as_slice());
    assert_eq!(sha256_hex(&bytes), sha256_hex(&body));
}

#[tokio::test]
async fn rejects_non_image_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wall.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"<html></html>".to_vec(), "text/html"))
        .mount(&server)
        .await;

    let err = downloader()
        .fetch(&format!("{}/wall.jpg", server.uri()))
        .await
        .expect_err("must fail");
    assert!(matches!(err, DownloadError::InvalidContentType(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rejects_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wall.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "image/png"))
        .mount(&server)
        .await;

    let err = downloader()
        .fetch(&format!("{}/wall.jpg", server.uri()))
        .await
        .expect_err("must fail");
    assert!(matches!(err, DownloadError::Empty));
}

#[tokio::test]
async fn classifies_status_transience() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.jpg"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dl = downloader();

    let err = dl
        .fetch(&format!("{}/gone.jpg", server.uri()))
        .await
        .expect_err("404");
    assert!(matches!(err, DownloadError::Status(404)));
    assert!(!err.is_transient());

    let err = dl
        .fetch(&format!("{}/flaky.jpg", server.uri()))
        .await
        .expect_err("502");
    assert!(matches!(err, DownloadError::Status(502)));
    assert!(err.is_transient());
}
