//! Action dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → classify (not an action: hand back untouched)
//!     → origin check
//!     → decode body into bound arguments (or the action a plain form names)
//!     → resolve action id in the page's worker scope
//!     → invoke once, classify the outcome
//!     → annotate revalidation, attach cookies
//!     → compose response (or hand back to the page renderer)
//! ```
//!
//! # Design Decisions
//! - `OversizedPayload` and `UnknownAction` abort the request; every other failure is an
//!   outcome and goes through the same composition as a normal result
//! - Aborted requests still carry the accumulated head, so `Cache-Control` is set on
//!   every response to a recognised action
//! - The request store lives on this task's stack and is passed down explicitly

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::CACHE_CONTROL;
use axum::http::request::Parts;
use axum::http::{Request, Response, StatusCode};

use crate::actions::args::BoundArguments;
use crate::actions::handler::RedirectSignal;
use crate::actions::invoker;
use crate::actions::manifest::{ActionModuleResolver, WorkerScope};
use crate::actions::outcome::{self, Outcome};
use crate::actions::registry::{ActionResolver, ModuleRegistry};
use crate::config::ServerConfig;
use crate::decode::{self, BodyDecoder, ModuleMap};
use crate::error::ActionError;
use crate::http::headers::NO_STORE;
use crate::http::probe::RedirectProbe;
use crate::http::request::{ActionRequest, BodyEncoding, DispatchMode};
use crate::http::response::{ResponseComposer, ResponseHead};
use crate::observability::metrics;
use crate::render::{ActionResult, FlightOptions, FlightRenderer};
use crate::security::verify_origin;
use crate::store::RequestStore;

/// What the HTTP layer should do after dispatch.
#[derive(Debug)]
pub enum Dispatch {
    /// Not an action request; handle it normally.
    NotAction(Request<Body>),
    /// The action ran (or the form named none); render the page with this head applied.
    RenderPage { parts: Parts, head: ResponseHead },
    /// The action signalled not-found; render the not-found page with this head applied.
    NotFound { parts: Parts, head: ResponseHead },
    /// A complete response.
    Done(Response<Body>),
    /// The request failed without a structured result; render `error` with this head
    /// applied.
    Failed { error: ActionError, head: ResponseHead },
}

/// How the decode stage ended.
enum Decoded {
    Outcome(Outcome),
    /// A plain form post without an action field.
    NoAction,
}

/// Runs server actions for recognised requests.
pub struct ActionDispatcher {
    resolver: ActionResolver,
    decoder: Arc<dyn BodyDecoder>,
    composer: ResponseComposer,
    config: ServerConfig,
}

impl ActionDispatcher {
    pub fn new(
        config: ServerConfig,
        manifest: Arc<dyn ActionModuleResolver>,
        modules: Arc<ModuleRegistry>,
        flight: Arc<dyn FlightRenderer>,
    ) -> Self {
        let actions = &config.actions;
        let decoder = decode::decoder_for(actions.runtime, actions.body_size_limit);
        let probe = RedirectProbe::new(config.probe.clone(), actions.base_path.clone());
        tracing::debug!(
            runtime = actions.runtime.as_str(),
            decoder = decoder.name(),
            limit = %actions.body_size_limit,
            "Action dispatcher ready"
        );
        Self {
            resolver: ActionResolver::new(manifest, modules),
            decoder,
            composer: ResponseComposer::new(flight, probe),
            config,
        }
    }

    /// Dispatch one request.
    ///
    /// Fatal failures, and generic failures of requests that do not expect a structured
    /// result, come back as [`Dispatch::Failed`].
    pub async fn dispatch(&self, request: Request<Body>) -> Dispatch {
        let Some(action) = ActionRequest::classify(request.method(), request.headers()) else {
            return Dispatch::NotAction(request);
        };
        let start = Instant::now();
        let mode = action.mode.as_str();

        let (parts, body) = request.into_parts();
        let pathname = parts.uri.path().to_string();
        let page = pathname
            .strip_prefix(self.config.actions.base_path.as_str())
            .filter(|p| p.is_empty() || p.starts_with('/'))
            .unwrap_or(&pathname);
        let scope = WorkerScope::for_page(self.config.actions.runtime, page);

        tracing::debug!(
            mode,
            action_id = action.action_id.as_deref().unwrap_or(""),
            pathname = %pathname,
            "Dispatching server action"
        );

        let mut head = ResponseHead::default();
        head.headers.insert(CACHE_CONTROL, NO_STORE);
        let mut store = RequestStore::new(pathname.clone(), &parts.headers);

        let outcome = match self.run(&action, &parts, body, &scope, &mut store).await {
            Ok(Decoded::Outcome(outcome)) => outcome,
            Ok(Decoded::NoAction) => {
                tracing::debug!(pathname = %pathname, "Form post names no action; rendering page");
                metrics::record_action(mode, "no_action", start);
                return Dispatch::RenderPage { parts, head };
            }
            Err(error) => {
                tracing::error!(mode, error = %error, kind = error.kind(), "Server action aborted");
                metrics::record_action(mode, error.kind(), start);
                return Dispatch::Failed { error, head };
            }
        };
        metrics::record_action(mode, outcome.label(), start);

        store.annotate(&mut head.headers).await;
        let path_was_revalidated = store.revalidation().path_was_revalidated();

        match outcome {
            Outcome::Success(value) => {
                store.mutable_cookies().append_to(&mut head.headers);
                if !action.is_fetch() {
                    return Dispatch::RenderPage { parts, head };
                }
                let options = FlightOptions {
                    action_result: ActionResult::fulfilled(value),
                    skip_flight: !path_was_revalidated,
                    as_not_found: false,
                };
                self.flight(&parts, head, options).await
            }
            Outcome::Redirect(RedirectSignal { url, mutable_cookies }) => {
                mutable_cookies
                    .as_ref()
                    .unwrap_or(store.mutable_cookies())
                    .append_to(&mut head.headers);
                if !action.is_fetch() {
                    return Dispatch::Done(self.composer.form_redirect(head, &url));
                }
                let tags = store.revalidation().revalidated_tags();
                Dispatch::Done(self.composer.fetch_redirect(&parts, head, &url, tags).await)
            }
            Outcome::NotFound(message) => {
                store.mutable_cookies().append_to(&mut head.headers);
                head.status = Some(StatusCode::NOT_FOUND);
                if !action.is_fetch() {
                    return Dispatch::NotFound { parts, head };
                }
                // The not-found tree is always rendered.
                let options = FlightOptions {
                    action_result: ActionResult::not_found(message),
                    skip_flight: false,
                    as_not_found: true,
                };
                self.flight(&parts, head, options).await
            }
            Outcome::Failure(error) => {
                tracing::error!(mode, error = %error, kind = error.kind(), "Server action failed");
                store.mutable_cookies().append_to(&mut head.headers);
                if !action.is_fetch() {
                    return Dispatch::Failed { error, head };
                }
                head.status = Some(StatusCode::INTERNAL_SERVER_ERROR);
                let options = FlightOptions {
                    action_result: ActionResult::rejected(error.to_string()),
                    skip_flight: !path_was_revalidated,
                    as_not_found: false,
                };
                self.flight(&parts, head, options).await
            }
        }
    }

    /// Render a structured result. A render failure keeps the head but not its status.
    async fn flight(&self, parts: &Parts, head: ResponseHead, options: FlightOptions) -> Dispatch {
        let mut fallback = head.clone();
        fallback.status = None;
        match self.composer.fetch_result(parts, head, options).await {
            Ok(response) => Dispatch::Done(response),
            Err(error) => {
                tracing::error!(error = %error, "Failed to render action result");
                Dispatch::Failed { error, head: fallback }
            }
        }
    }

    /// Decode, resolve and invoke. `Err` only for fatal errors.
    async fn run(
        &self,
        action: &ActionRequest,
        parts: &Parts,
        body: Body,
        scope: &WorkerScope,
        store: &mut RequestStore,
    ) -> Result<Decoded, ActionError> {
        if let Err(err) = verify_origin(&parts.headers, &self.config.actions.allowed_origins) {
            return Ok(Decoded::Outcome(err.into()));
        }

        let modules = ModuleMap::new(&self.resolver, scope);

        // Plain multipart form posts name their action in the body and run it directly.
        if action.mode == DispatchMode::MultipartFormAction {
            let form = match self.decoder.read_multipart(&parts.headers, body).await {
                Ok(form) => form,
                Err(err) => return non_fatal(err),
            };
            let bound = match decode::decode_action(&form, modules) {
                Ok(Some(bound)) => bound,
                Ok(None) => return Ok(Decoded::NoAction),
                Err(err) => return non_fatal(err),
            };
            tracing::debug!(action_id = bound.id(), "Running form action");
            let result = bound.call(store, Vec::new()).await;
            return Ok(Decoded::Outcome(outcome::classify(result)));
        }

        let args = match self.decode_arguments(action, parts, body, modules).await {
            Ok(args) => args,
            Err(err) => return non_fatal(err),
        };

        let action_id = action.action_id.as_deref().unwrap_or_default();
        let handler = self.resolver.resolve(action_id, scope)?;
        let result = invoker::invoke(handler.as_ref(), store, args).await;
        Ok(Decoded::Outcome(outcome::classify(result)))
    }

    async fn decode_arguments(
        &self,
        action: &ActionRequest,
        parts: &Parts,
        body: Body,
        modules: ModuleMap<'_>,
    ) -> Result<BoundArguments, ActionError> {
        match action.encoding {
            BodyEncoding::Text => {
                let text = self.decoder.read_text(&parts.headers, body).await?;
                decode::decode_reply_text(&text, modules)
            }
            BodyEncoding::UrlEncoded => {
                let form = self.decoder.read_urlencoded(&parts.headers, body).await?;
                decode::decode_reply_form(&form, modules)
            }
            BodyEncoding::Multipart => {
                let form = self.decoder.read_multipart(&parts.headers, body).await?;
                decode::decode_reply_form(&form, modules)
            }
        }
    }
}

/// Fatal errors propagate; anything else becomes a failure outcome.
fn non_fatal(err: ActionError) -> Result<Decoded, ActionError> {
    if err.is_fatal() {
        Err(err)
    } else {
        Ok(Decoded::Outcome(Outcome::Failure(err)))
    }
}
