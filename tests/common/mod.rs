//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use action_dispatch::actions::{
    ActionArg, ActionHandler, ActionManifest, ActionReturn, ActionSignal, BoundArguments,
    ModuleRegistry, WorkerScope,
};
use action_dispatch::config::{Runtime, ServerConfig};
use action_dispatch::http::headers::{REVALIDATED_TAGS, REVALIDATE_TAG_TOKEN, RSC};
use action_dispatch::http::{ActionApp, HttpServer};
use action_dispatch::lifecycle::Shutdown;
use action_dispatch::render::{PageRenderer, FLIGHT_CONTENT_TYPE};
use action_dispatch::store::{RequestStore, ResponseCookie};
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Response, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

pub const MODULE: &str = "app/page.actions";
pub const BOUNDARY: &str = "----test-boundary";

/// What a [`TestAction`] does when called.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Returns its arguments as a JSON array.
    Echo,
    /// Revalidates the `posts` tag and returns `1`.
    RevalidateTag,
    /// Revalidates `/` and returns `true`.
    RevalidatePath,
    /// Sets `session=abc` and redirects to `/dashboard`.
    Login,
    /// Revalidates the `posts` tag, then redirects to `/dashboard`.
    Publish,
    /// Redirects to a page that never renders a structured payload.
    GoPlain,
    /// Redirects to a page that answers 404.
    GoGone,
    /// Redirects off-site.
    GoExternal,
    /// Reads `title` from the submitted form and sets `last-todo`.
    AddTodo,
    NotFound,
    /// Signals not-found with the message `no post 7`.
    MissingPost,
    Fail,
}

/// An action that counts its executions.
pub struct TestAction {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl ActionHandler for TestAction {
    fn call<'a>(&'a self, store: &'a mut RequestStore, args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Echo => Ok(JsonValue::Array(args.iter().map(ActionArg::to_json).collect())),
                Behavior::RevalidateTag => {
                    store.revalidate_tag("posts");
                    Ok(json!(1))
                }
                Behavior::RevalidatePath => {
                    store.revalidate_path("/");
                    Ok(json!(true))
                }
                Behavior::Login => {
                    store
                        .cookies_mut()?
                        .set(ResponseCookie::new("session", "abc").with_attributes("Path=/; HttpOnly"));
                    Err(store.redirect("/dashboard"))
                }
                Behavior::Publish => {
                    store.revalidate_tag("posts");
                    Err(store.redirect("/dashboard"))
                }
                Behavior::GoPlain => Err(store.redirect("/plain")),
                Behavior::GoGone => Err(store.redirect("/gone")),
                Behavior::GoExternal => Err(store.redirect("https://example.com/elsewhere")),
                Behavior::AddTodo => {
                    let title = args
                        .iter()
                        .find_map(|arg| arg.as_form().and_then(|form| form.get_text("title")))
                        .unwrap_or("untitled")
                        .to_string();
                    store
                        .cookies_mut()?
                        .set(ResponseCookie::new("last-todo", title.as_str()));
                    Ok(json!({ "added": title }))
                }
                Behavior::NotFound => Err(store.not_found()),
                Behavior::MissingPost => Err(store.not_found_with("no post 7")),
                Behavior::Fail => Err(ActionSignal::Error("boom".into())),
            }
        })
    }
}

/// Page renderer that reports what it was asked to render.
///
/// `/plain` always answers HTML and `/gone` always answers 404, so the redirect probe
/// has something to fall back from.
pub struct TestPages;

impl PageRenderer for TestPages {
    fn render(&self, parts: Parts, not_found: bool) -> BoxFuture<'_, Response<Body>> {
        Box::pin(async move {
            let path = parts.uri.path().to_string();
            let header = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            let payload = json!({
                "page": path,
                "cookie": header(COOKIE.as_str()),
                "tags": header(REVALIDATED_TAGS.as_str()),
                "token": header(REVALIDATE_TAG_TOKEN.as_str()),
            });

            let mut response = if path == "/gone" || not_found {
                let mut response = Response::new(Body::from("not found"));
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            } else if parts.headers.contains_key(RSC) && path != "/plain" {
                let mut response = Response::new(Body::from(payload.to_string()));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(FLIGHT_CONTENT_TYPE));
                response
            } else {
                Response::new(Body::from(format!("<h1>{path}</h1>")))
            };

            if !response.headers().contains_key(CONTENT_TYPE) {
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            }
            response
        })
    }
}

/// Test application plus its shared call counter.
pub struct TestApp {
    pub app: ActionApp,
    pub calls: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Every [`Behavior`] registered under its kebab-case id on page `/`.
pub fn test_app(runtime: Runtime) -> TestApp {
    let calls = Arc::new(AtomicUsize::new(0));
    let actions = [
        ("echo", Behavior::Echo),
        ("revalidate-tag", Behavior::RevalidateTag),
        ("revalidate-path", Behavior::RevalidatePath),
        ("login", Behavior::Login),
        ("publish", Behavior::Publish),
        ("go-plain", Behavior::GoPlain),
        ("go-gone", Behavior::GoGone),
        ("go-external", Behavior::GoExternal),
        ("add-todo", Behavior::AddTodo),
        ("not-found", Behavior::NotFound),
        ("missing-post", Behavior::MissingPost),
        ("fail", Behavior::Fail),
    ];

    let scope = WorkerScope::for_page(runtime, "/");
    let mut manifest = ActionManifest::new();
    let modules = ModuleRegistry::new();
    for (id, behavior) in actions {
        manifest.insert(id, &scope, MODULE);
        modules.register(
            MODULE,
            id,
            TestAction {
                behavior,
                calls: calls.clone(),
            },
        );
    }

    TestApp {
        app: ActionApp::new(Arc::new(manifest), Arc::new(modules), Arc::new(TestPages)),
        calls,
    }
}

/// Defaults with metrics off and the probe disabled.
pub fn test_config(runtime: Runtime) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.actions.runtime = runtime;
    config.observability.metrics_enabled = false;
    config.probe.enabled = false;
    config
}

/// Multipart body with the given text fields, in order.
pub fn multipart_body(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Serve `server` on `listener` in the background.
pub fn spawn_server(server: HttpServer, listener: TcpListener, shutdown: &Shutdown) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, shutdown).await;
    });
}
