//! Small built-in application served when no manifest is configured.
//!
//! Actions on `/` (module `app/page.actions`):
//! - `echo`: returns its arguments
//! - `add-todo`: reads `title` from a form, sets a cookie, revalidates `/`
//! - `go-home`: redirects to `/`
//! - `missing`: signals not-found

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Response, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::{json, Value as JsonValue};

use crate::actions::{ActionArg, ActionManifest, ActionReturn, BoundArguments, ModuleRegistry, WorkerScope};
use crate::config::Runtime;
use crate::http::headers::RSC;
use crate::http::ActionApp;
use crate::render::{PageRenderer, FLIGHT_CONTENT_TYPE};
use crate::store::{RequestStore, ResponseCookie};

const MODULE: &str = "app/page.actions";

fn echo<'a>(_store: &'a mut RequestStore, args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
    Box::pin(async move { Ok(JsonValue::Array(args.iter().map(ActionArg::to_json).collect())) })
}

fn add_todo<'a>(store: &'a mut RequestStore, args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
    Box::pin(async move {
        let title = args
            .iter()
            .find_map(|arg| arg.as_form().and_then(|form| form.get_text("title")))
            .unwrap_or("untitled")
            .to_string();

        store
            .cookies_mut()?
            .set(ResponseCookie::new("last-todo", title.as_str()).with_attributes("Path=/"));
        store.revalidate_path("/");
        tracing::info!(title = %title, "Todo added");
        Ok(json!({ "added": title }))
    })
}

fn go_home<'a>(store: &'a mut RequestStore, _args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
    Box::pin(async move { Err(store.redirect("/")) })
}

fn missing<'a>(store: &'a mut RequestStore, _args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
    Box::pin(async move { Err(store.not_found()) })
}

/// Minimal page renderer: HTML for navigations, a structured payload when asked for one.
#[derive(Debug, Clone, Default)]
pub struct DemoPages;

impl PageRenderer for DemoPages {
    fn render(&self, parts: Parts, not_found: bool) -> BoxFuture<'_, Response<Body>> {
        Box::pin(async move {
            let path = parts.uri.path().to_string();
            let structured = parts.headers.contains_key(RSC);

            let (content_type, body) = if structured {
                (
                    FLIGHT_CONTENT_TYPE,
                    json!({ "page": path, "notFound": not_found }).to_string(),
                )
            } else if not_found {
                ("text/html; charset=utf-8", "<h1>404: not found</h1>".to_string())
            } else {
                ("text/html; charset=utf-8", format!("<h1>{path}</h1>"))
            };

            let mut response = Response::new(Body::from(body));
            if not_found {
                *response.status_mut() = StatusCode::NOT_FOUND;
            }
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            response
        })
    }
}

/// The demo actions with a manifest built in code.
pub fn app(runtime: Runtime) -> ActionApp {
    let scope = WorkerScope::for_page(runtime, "/");
    let mut manifest = ActionManifest::new();
    for id in ["echo", "add-todo", "go-home", "missing"] {
        manifest.insert(id, &scope, MODULE);
    }

    ActionApp::new(Arc::new(manifest), Arc::new(modules()), Arc::new(DemoPages))
}

/// The demo action module, for use with a manifest loaded from disk.
pub fn modules() -> ModuleRegistry {
    let modules = ModuleRegistry::new();
    modules.register(MODULE, "echo", echo);
    modules.register(MODULE, "add-todo", add_todo);
    modules.register(MODULE, "go-home", go_home);
    modules.register(MODULE, "missing", missing);
    modules
}
