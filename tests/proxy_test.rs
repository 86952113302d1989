//! Image proxy tests against a stubbed file host

mod common;

use common::{hat_backend, StoreTest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

async fn store_trusting(host: &MockServer) -> StoreTest {
    let trusted = host.uri();
    StoreTest::start_with(hat_backend(), move |config| {
        config.trusted_file_host = trusted;
    })
    .await
    .unwrap()
}

fn proxy_path(target: &str) -> String {
    format!(
        "/api/proxy-image?url={}",
        url::form_urlencoded::byte_serialize(target.as_bytes()).collect::<String>()
    )
}

#[tokio::test]
async fn test_missing_url_param() {
    let store = StoreTest::start(hat_backend()).await.unwrap();

    for path in ["/api/proxy-image", "/api/proxy-image?url="] {
        let resp = store.get(path).await.unwrap();
        assert_eq!(resp.status(), 400, "{}", path);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Missing url param");
    }
}

#[tokio::test]
async fn test_foreign_origin_forbidden() {
    let host = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&host)
        .await;
    let store = store_trusting(&host).await;

    let resp = store
        .get(&proxy_path("https://evil.example.com/cat.png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");

    // Same host, different port is a different origin
    let addr = host.address();
    let other_port = format!("http://{}:{}/cat.png", addr.ip(), addr.port() + 1);
    let resp = store.get(&proxy_path(&other_port)).await.unwrap();
    assert_eq!(resp.status(), 403);

    // Not a URL at all
    let resp = store.get(&proxy_path("cat.png")).await.unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_proxies_trusted_image() {
    let host = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/links/hat.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .insert_header("etag", "\"abc123\"")
                .set_body_bytes(PNG_BYTES),
        )
        .expect(1)
        .mount(&host)
        .await;
    let store = store_trusting(&host).await;

    let target = format!("{}/links/hat.png", host.uri());
    let resp = store.get(&proxy_path(&target)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let headers = resp.headers();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["cache-control"], "public, max-age=3600");
    assert_eq!(headers["etag"], "\"abc123\"");

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_upstream_error_status_propagated() {
    let host = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such file"))
        .mount(&host)
        .await;
    let store = store_trusting(&host).await;

    let target = format!("{}/links/missing.png", host.uri());
    let resp = store.get(&proxy_path(&target)).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    let body = resp.bytes().await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Trust an origin nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let trusted = dead.clone();
    let store = StoreTest::start_with(hat_backend(), move |config| {
        config.trusted_file_host = trusted;
    })
    .await
    .unwrap();

    let resp = store
        .get(&proxy_path(&format!("{}/links/hat.png", dead)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
}
