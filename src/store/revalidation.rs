//! Cache revalidation bookkeeping and the `x-action-revalidated` summary.
//!
//! Tags and pending invalidation work accumulate while the action runs. Before a response
//! is composed the pending work is joined and a single summary header is written:
//! `[[], tagRevalidated, cookieRevalidated]`. The leading list is reserved for per-path
//! granularity and is always empty; any tag revalidation means "refresh everything".

use std::fmt;
use std::future::Future;

use axum::http::{HeaderMap, HeaderValue};
use futures_util::future::{join_all, BoxFuture};

use crate::http::headers::ACTION_REVALIDATED;
use crate::store::cookies::MutableCookies;

/// Prefix of the implicit tag recorded for `revalidate_path`.
pub const IMPLICIT_PATH_TAG_PREFIX: &str = "_path_";

/// In-flight cache invalidation started by an action.
pub type PendingRevalidation = BoxFuture<'static, ()>;

/// Revalidation work accumulated during one request.
#[derive(Default)]
pub struct RevalidationState {
    revalidated_tags: Vec<String>,
    path_was_revalidated: bool,
    pending: Vec<PendingRevalidation>,
}

impl fmt::Debug for RevalidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevalidationState")
            .field("revalidated_tags", &self.revalidated_tags)
            .field("path_was_revalidated", &self.path_was_revalidated)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl RevalidationState {
    /// Mark a cache tag as stale.
    pub fn revalidate_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.revalidated_tags.contains(&tag) {
            self.revalidated_tags.push(tag);
        }
        self.path_was_revalidated = true;
    }

    /// Mark a path as stale. Tracked as an implicit tag.
    pub fn revalidate_path(&mut self, path: &str) {
        self.revalidate_tag(format!("{IMPLICIT_PATH_TAG_PREFIX}{path}"));
    }

    /// Register invalidation work that must finish before the response head is written.
    pub fn defer<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(work));
    }

    pub fn revalidated_tags(&self) -> &[String] {
        &self.revalidated_tags
    }

    pub fn path_was_revalidated(&self) -> bool {
        self.path_was_revalidated
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Await every pending task concurrently and clear the queue.
    pub async fn settle(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::debug!(tasks = pending.len(), "Awaiting pending revalidations");
            join_all(pending).await;
        }
    }
}

/// Final revalidation state reported to the client router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidationSummary {
    pub tag_revalidated: bool,
    pub cookie_revalidated: bool,
}

impl RevalidationSummary {
    /// Compact `[[], T, C]` encoding with flags as 1/0.
    pub fn header_value(&self) -> HeaderValue {
        let encoded = serde_json::json!([
            [],
            u8::from(self.tag_revalidated),
            u8::from(self.cookie_revalidated)
        ]);
        HeaderValue::from_str(&encoded.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("[[],0,0]"))
    }
}

/// Settle pending work, then write `x-action-revalidated` onto `headers`.
pub async fn annotate(
    revalidation: &mut RevalidationState,
    cookies: &MutableCookies,
    headers: &mut HeaderMap,
) -> RevalidationSummary {
    revalidation.settle().await;

    let summary = RevalidationSummary {
        tag_revalidated: !revalidation.revalidated_tags().is_empty(),
        cookie_revalidated: !cookies.is_empty(),
    };
    headers.insert(ACTION_REVALIDATED, summary.header_value());
    summary
}
