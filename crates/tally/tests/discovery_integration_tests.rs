//! Integration tests for release discovery against a mocked GitHub API.

use tally::network::{build_http_client, default_user_agent, ProxyConfig, TimeoutConfig};
use tally::updater::{
    DiscoveryConfig, DiscoveryError, ReleaseDiscoveryClient, Repository, GITHUB_ACCEPT,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST_PATH: &str = "/repos/guoziyangnb/bookkeeping-app/releases/latest";
const FIXTURE: &str = include_str!("fixtures/latest_release.json");

fn discovery(
    server: &MockServer,
    current: &str,
    token: Option<&str>,
    proxy: Option<&str>,
) -> ReleaseDiscoveryClient {
    let client = build_http_client(
        &default_user_agent(),
        &ProxyConfig::default(),
        &TimeoutConfig::default(),
    )
    .unwrap();

    ReleaseDiscoveryClient::new(
        client,
        DiscoveryConfig {
            repository: Repository::new("guoziyangnb", "bookkeeping-app"),
            current_version: current.to_string(),
            auth_token: token.map(str::to_string),
            download_proxy: proxy.map(str::to_string),
            package_extension: ".apk".to_string(),
            api_base: server.uri(),
        },
    )
}

async fn mount_fixture(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .and(header("accept", GITHUB_ACCEPT))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_newer_release_produces_update_info() {
    let server = MockServer::start().await;
    mount_fixture(&server).await;

    let info = discovery(&server, "1.0.7", None, None)
        .check_for_update()
        .await
        .expect("discovery should succeed")
        .expect("v1.0.8 is newer than 1.0.7");

    assert_eq!(info.latest_version, "v1.0.8");
    assert_eq!(info.current_version, "1.0.7");
    assert_eq!(info.file_name, "app-release.apk");
    assert_eq!(info.file_size, 20_000_000);
    assert_eq!(
        info.download_url,
        "https://github.com/guoziyangnb/bookkeeping-app/releases/download/v1.0.8/app-release.apk"
    );
    assert_eq!(info.update_log, "- 修复账单导出\n- 新增预算提醒");
    assert_eq!(
        info.release_url,
        "https://github.com/guoziyangnb/bookkeeping-app/releases/tag/v1.0.8"
    );
    assert_eq!(info.published_at.as_deref(), Some("2024-06-01T08:30:00Z"));
}

#[tokio::test]
async fn test_same_version_is_up_to_date() {
    let server = MockServer::start().await;
    mount_fixture(&server).await;

    let update = discovery(&server, "v1.0.8", None, None)
        .check_for_update()
        .await
        .unwrap();
    assert!(update.is_none());
}

#[tokio::test]
async fn test_download_url_gets_proxy_prefix() {
    let server = MockServer::start().await;
    mount_fixture(&server).await;

    let info = discovery(&server, "1.0.7", None, Some("https://hk.gh-proxy.org/"))
        .check_for_update()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        info.download_url,
        "https://hk.gh-proxy.org/https://github.com/guoziyangnb/bookkeeping-app/releases/download/v1.0.8/app-release.apk"
    );
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
        .expect(1)
        .mount(&server)
        .await;

    let update = discovery(&server, "1.0.7", Some("ghp_test"), None)
        .check_for_update()
        .await
        .unwrap();
    assert!(update.is_some());
}

#[tokio::test]
async fn test_no_authorization_without_token() {
    let server = MockServer::start().await;
    mount_fixture(&server).await;

    discovery(&server, "1.0.7", None, None)
        .fetch_latest_release()
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.starts_with("tally-updater/")));
}

#[tokio::test]
async fn test_rate_limited_response_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_string(r#"{"message":"API rate limit exceeded"}"#),
        )
        .mount(&server)
        .await;

    let err = discovery(&server, "1.0.7", None, None)
        .check_for_update()
        .await
        .unwrap_err();

    match err {
        DiscoveryError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("rate limit"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_truncated_error_body_keeps_status() {
    // 声明的长度比实际发送的多，读取响应体会失败
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
    });

    let client = build_http_client(
        &default_user_agent(),
        &ProxyConfig::default(),
        &TimeoutConfig::default(),
    )
    .unwrap();
    let discovery = ReleaseDiscoveryClient::new(
        client,
        DiscoveryConfig {
            repository: Repository::new("guoziyangnb", "bookkeeping-app"),
            current_version: "1.0.7".to_string(),
            auth_token: None,
            download_proxy: None,
            package_extension: ".apk".to_string(),
            api_base: format!("http://{}", addr),
        },
    );

    match discovery.check_for_update().await.unwrap_err() {
        DiscoveryError::Status { status, .. } => assert_eq!(status, 503),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_package_is_no_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"tag_name":"v2.0.0","html_url":"https://example.com","assets":[{"name":"app.ipa","size":1,"browser_download_url":"https://example.com/app.ipa"}]}"#,
        ))
        .mount(&server)
        .await;

    let update = discovery(&server, "1.0.7", None, None)
        .check_for_update()
        .await
        .unwrap();
    assert!(update.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = discovery(&server, "1.0.7", None, None)
        .check_for_update()
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidRelease(_)));
}
