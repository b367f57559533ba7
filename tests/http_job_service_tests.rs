//! `HttpJobService` against a mock job service
use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crawl_task_tracker::infrastructure::config::ServiceConfig;
use crawl_task_tracker::infrastructure::{HttpJobService, JobService, JobServiceError};
use crawl_task_tracker::{JobRequest, TaskController, TaskHandle, TaskStatus};

fn service_for(server: &Server) -> HttpJobService {
    let config = ServiceConfig {
        base_url: server.url(),
        ..ServiceConfig::default()
    };
    HttpJobService::new(&config).unwrap()
}

#[tokio::test]
async fn create_job_posts_snake_case_body() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/api/scrape/website")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "url": "https://example.com",
            "max_pages": 50,
            "max_workers": 3,
            "include_subdomains": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"task_id":"abc123","status":"PENDING","message":"Scraping task started"}"#)
        .create_async()
        .await;

    let request = JobRequest::new("https://example.com")
        .with_max_pages(50)
        .with_max_workers(3)
        .with_include_subdomains(false);
    let handle = service_for(&server).create_job(&request).await.unwrap();

    assert_eq!(handle, TaskHandle::new("abc123"));
    create.assert_async().await;
}

#[tokio::test]
async fn create_job_without_task_id_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/scrape/website")
        .with_status(200)
        .with_body(r#"{"status":"PENDING"}"#)
        .create_async()
        .await;

    let err = service_for(&server)
        .create_job(&JobRequest::new("https://example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, JobServiceError::MalformedResponse { .. }));
}

#[tokio::test]
async fn read_status_decodes_result() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task/abc123")
        .with_status(200)
        .with_body(
            json!({
                "status": "COMPLETED",
                "type": "website",
                "created_at": "2024-05-01T10:00:00",
                "result": {"pages_scraped": 50, "download_url": "/downloads/abc123.json"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let report = assert_ok!(service_for(&server).read_status(&TaskHandle::new("abc123")).await);
    assert_eq!(report.status, TaskStatus::Completed);
    let result = report.result.unwrap();
    assert_eq!(result.pages_scraped, 50);
    assert_eq!(result.download_url.as_deref(), Some("/downloads/abc123.json"));
}

#[tokio::test]
async fn unknown_status_text_is_preserved() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task/t-7")
        .with_status(200)
        .with_body(r#"{"status":"SCRAPING"}"#)
        .create_async()
        .await;

    let report = assert_ok!(service_for(&server).read_status(&TaskHandle::new("t-7")).await);
    assert_eq!(report.status, TaskStatus::Other("SCRAPING".into()));
    assert!(report.result.is_none());
}

#[tokio::test]
async fn server_error_maps_to_http_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task/abc123")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let err = assert_err!(service_for(&server).read_status(&TaskHandle::new("abc123")).await);
    assert_eq!(err.status_code(), Some(500));
    assert!(err.is_transient());
}

#[tokio::test]
async fn unknown_task_is_not_transient() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task/gone")
        .with_status(404)
        .with_body(r#"{"detail":"Task not found"}"#)
        .create_async()
        .await;

    let err = assert_err!(service_for(&server).read_status(&TaskHandle::new("gone")).await);
    assert_eq!(err.status_code(), Some(404));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task/abc123")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = assert_err!(service_for(&server).read_status(&TaskHandle::new("abc123")).await);
    assert!(matches!(err, JobServiceError::MalformedResponse { .. }));
}

#[tokio::test]
async fn health_reads_status_field() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .create_async()
        .await;

    assert!(assert_ok!(service_for(&server).health().await));
}

#[tokio::test]
async fn base_url_path_prefix_is_kept_on_the_wire() {
    let mut server = Server::new_async().await;
    let health = server
        .mock("GET", "/crawler/api/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .create_async()
        .await;
    let config = ServiceConfig {
        base_url: format!("{}/crawler", server.url()),
        ..ServiceConfig::default()
    };

    let service = HttpJobService::new(&config).unwrap();
    assert!(assert_ok!(service.health().await));
    health.assert_async().await;
}

#[tokio::test]
async fn download_resolves_relative_link() {
    let mut server = Server::new_async().await;
    let file = server
        .mock("GET", "/downloads/abc123.json")
        .with_status(200)
        .with_body(r#"[{"url":"https://example.com"}]"#)
        .create_async()
        .await;

    let bytes = assert_ok!(service_for(&server).download("/downloads/abc123.json").await);
    assert_eq!(bytes, br#"[{"url":"https://example.com"}]"#);
    file.assert_async().await;
}

#[tokio::test]
async fn controller_follows_job_over_http() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/scrape/website")
        .with_status(200)
        .with_body(r#"{"task_id":"abc123","status":"PENDING"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/task/abc123")
        .with_status(200)
        .with_body(
            r#"{"status":"COMPLETED","result":{"pages_scraped":3,"download_url":"/downloads/abc123.json"}}"#,
        )
        .create_async()
        .await;

    let controller = TaskController::new(Arc::new(service_for(&server)), Duration::from_millis(50));
    controller.submit(JobRequest::new("https://example.com")).await.unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), controller.wait_until_terminal())
        .await
        .unwrap();
    assert_eq!(snapshot.status, Some(TaskStatus::Completed));
    assert_eq!(
        controller.resolved_download_url().unwrap().as_str(),
        format!("{}/downloads/abc123.json", server.url())
    );
}
