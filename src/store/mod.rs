//! Request-scoped state.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → RequestStore::new (parse cookie header, pathname)
//!     → invoker enters the action phase (ActionPhase guard)
//!     → action reads cookies, sets cookies, revalidates tags/paths
//!     → guard drops: back to render phase
//!     → revalidation.rs settles pending work, writes x-action-revalidated
//! ```
//!
//! # Design Decisions
//! - The store is owned by one request and passed explicitly, never held in a global
//! - Cookie writes are refused outside the action phase

pub mod cookies;
pub mod revalidation;

use std::ops::{Deref, DerefMut};

use axum::http::HeaderMap;

pub use cookies::{MutableCookies, ResponseCookie};
pub use revalidation::{RevalidationState, RevalidationSummary};

use crate::actions::{ActionSignal, RedirectSignal};
use crate::error::ActionError;

/// Which part of the request lifecycle is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Render,
    Action,
}

/// Mutable per-request state shared by the dispatcher and the running action.
#[derive(Debug)]
pub struct RequestStore {
    pathname: String,
    phase: Phase,
    request_cookies: Vec<(String, String)>,
    mutable_cookies: MutableCookies,
    revalidation: RevalidationState,
}

impl RequestStore {
    pub fn new(pathname: impl Into<String>, headers: &HeaderMap) -> Self {
        Self {
            pathname: pathname.into(),
            phase: Phase::Render,
            request_cookies: cookies::parse_cookie_header(headers),
            mutable_cookies: MutableCookies::new(),
            revalidation: RevalidationState::default(),
        }
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while an action is running.
    pub fn is_action(&self) -> bool {
        self.phase == Phase::Action
    }

    /// Current value of a cookie, including writes made by the action.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        if let Some(cookie) = self.mutable_cookies.get(name) {
            return Some(cookie.value());
        }
        self.request_cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Cookie writes for this response. Only available while an action runs.
    pub fn cookies_mut(&mut self) -> Result<&mut MutableCookies, ActionError> {
        if self.is_action() {
            Ok(&mut self.mutable_cookies)
        } else {
            Err(ActionError::ReadonlyCookies)
        }
    }

    pub fn mutable_cookies(&self) -> &MutableCookies {
        &self.mutable_cookies
    }

    pub fn revalidation(&self) -> &RevalidationState {
        &self.revalidation
    }

    pub fn revalidation_mut(&mut self) -> &mut RevalidationState {
        &mut self.revalidation
    }

    pub fn revalidate_tag(&mut self, tag: impl Into<String>) {
        self.revalidation.revalidate_tag(tag);
    }

    pub fn revalidate_path(&mut self, path: &str) {
        self.revalidation.revalidate_path(path);
    }

    /// Build a redirect signal carrying the cookies mutated so far.
    pub fn redirect(&self, url: impl Into<String>) -> ActionSignal {
        let mutable_cookies =
            (!self.mutable_cookies.is_empty()).then(|| self.mutable_cookies.clone());
        ActionSignal::Redirect(RedirectSignal {
            url: url.into(),
            mutable_cookies,
        })
    }

    pub fn not_found(&self) -> ActionSignal {
        ActionSignal::NotFound(None)
    }

    /// Not-found signal whose message reaches the rejected action result.
    pub fn not_found_with(&self, message: impl Into<String>) -> ActionSignal {
        ActionSignal::NotFound(Some(message.into()))
    }

    /// Settle pending revalidations and write the summary header.
    pub async fn annotate(&mut self, headers: &mut HeaderMap) -> RevalidationSummary {
        revalidation::annotate(&mut self.revalidation, &self.mutable_cookies, headers).await
    }

    /// Switch to the action phase until the returned guard is dropped.
    pub(crate) fn enter_action(&mut self) -> ActionPhase<'_> {
        let previous = std::mem::replace(&mut self.phase, Phase::Action);
        ActionPhase {
            store: self,
            previous,
        }
    }
}

/// Guard marking the store as executing an action.
///
/// Dropping it (normal return, error, panic or cancellation) restores the previous phase.
pub struct ActionPhase<'a> {
    store: &'a mut RequestStore,
    previous: Phase,
}

impl Deref for ActionPhase<'_> {
    type Target = RequestStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl DerefMut for ActionPhase<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl Drop for ActionPhase<'_> {
    fn drop(&mut self) {
        self.store.phase = self.previous;
    }
}
