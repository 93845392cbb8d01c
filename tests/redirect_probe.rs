//! Redirect probe against a live server: the target page is fetched over HTTP and
//! streamed back inline, or the response falls back to the bare redirect.

use std::net::SocketAddr;

use action_dispatch::config::Runtime;
use action_dispatch::http::HttpServer;
use action_dispatch::lifecycle::Shutdown;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

mod common;

use common::{spawn_server, test_app, test_config, TestApp};

async fn start(token: Option<&str>) -> (SocketAddr, TestApp, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = test_app(Runtime::Node);
    let mut config = test_config(Runtime::Node);
    config.probe.enabled = true;
    config.probe.origin = Some(format!("http://{addr}"));
    config.probe.revalidate_tag_token = token.map(str::to_string);

    let shutdown = Shutdown::new();
    spawn_server(HttpServer::new(config, app.app.clone()), listener, &shutdown);
    (addr, app, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn post_action(addr: SocketAddr, action_id: &str) -> reqwest::Response {
    client()
        .post(format!("http://{addr}/"))
        .header("x-action-id", action_id)
        .header("content-type", "text/plain;charset=UTF-8")
        .header("cookie", "theme=dark; session=old")
        .header("router-state-tree", "%5B%22%22%5D")
        .body("[]")
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_redirect_target_is_streamed_inline() {
    let (addr, app, shutdown) = start(None).await;

    let response = post_action(addr, "login").await;

    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    assert_eq!(headers.get("x-action-redirect").unwrap(), "/dashboard");
    assert_eq!(headers.get("content-type").unwrap(), "text/x-component");
    assert_eq!(
        headers.get("set-cookie").unwrap(),
        "session=abc; Path=/; HttpOnly"
    );

    let json: JsonValue = response.json().await.unwrap();
    assert_eq!(json["page"], json!("/dashboard"));
    // The cookie set by the action replaces the stale request cookie.
    assert_eq!(json["cookie"], json!("theme=dark; session=abc"));
    assert_eq!(app.calls(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_revalidated_tags_reach_the_target() {
    let (addr, _app, shutdown) = start(Some("secret")).await;

    let response = post_action(addr, "publish").await;

    assert_eq!(response.headers().get("x-action-redirect").unwrap(), "/dashboard");
    assert_eq!(
        response.headers().get("x-action-revalidated").unwrap(),
        "[[],1,0]"
    );
    let json: JsonValue = response.json().await.unwrap();
    assert_eq!(json["tags"], json!("posts"));
    assert_eq!(json["token"], json!("secret"));
    assert_eq!(json["cookie"], json!("theme=dark; session=old"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_structured_target_falls_back() {
    let (addr, app, shutdown) = start(None).await;

    let response = post_action(addr, "go-plain").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-action-redirect").unwrap(), "/plain");
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/x-component"
    );
    assert_eq!(response.text().await.unwrap(), "{}");
    assert_eq!(app.calls(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_failing_target_falls_back() {
    let (addr, _app, shutdown) = start(None).await;

    let response = post_action(addr, "go-gone").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-action-redirect").unwrap(), "/gone");
    assert_eq!(response.text().await.unwrap(), "{}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_origin_falls_back() {
    // Bind and drop to get a port nothing listens on.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = test_app(Runtime::Node);
    let mut config = test_config(Runtime::Node);
    config.probe.enabled = true;
    config.probe.origin = Some(format!("http://{dead}"));

    let shutdown = Shutdown::new();
    spawn_server(HttpServer::new(config, app.app.clone()), listener, &shutdown);

    let response = post_action(addr, "login").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-action-redirect").unwrap(), "/dashboard");
    assert!(response.headers().get("set-cookie").is_some());
    assert_eq!(response.text().await.unwrap(), "{}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_page_requests_still_served() {
    let (addr, app, shutdown) = start(None).await;

    let response = client()
        .get(format!("http://{addr}/about"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.text().await.unwrap(), "<h1>/about</h1>");
    assert_eq!(app.calls(), 0);

    shutdown.trigger();
}
