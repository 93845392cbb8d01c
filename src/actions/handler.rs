//! Action implementations and the control-flow signals they return.

use std::fmt;

use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;

use crate::actions::args::BoundArguments;
use crate::error::BoxError;
use crate::store::{MutableCookies, RequestStore};

/// What an action call returns.
pub type ActionReturn = Result<JsonValue, ActionSignal>;

/// Non-value exits from an action.
pub enum ActionSignal {
    /// Navigate to another URL.
    Redirect(RedirectSignal),
    /// Render the not-found page, optionally saying what was missing.
    NotFound(Option<String>),
    /// Any other failure.
    Error(BoxError),
}

/// Redirect target plus the cookies mutated before the redirect was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSignal {
    pub url: String,
    pub mutable_cookies: Option<MutableCookies>,
}

impl fmt::Debug for ActionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSignal::Redirect(signal) => f.debug_tuple("Redirect").field(signal).finish(),
            ActionSignal::NotFound(message) => f.debug_tuple("NotFound").field(message).finish(),
            ActionSignal::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
        }
    }
}

// Lets actions use `?` on ordinary errors.
impl<E> From<E> for ActionSignal
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        ActionSignal::Error(Box::new(err))
    }
}

/// A server action callable.
///
/// Implemented for plain functions of the form
/// `fn name<'a>(store: &'a mut RequestStore, args: BoundArguments) -> BoxFuture<'a, ActionReturn>`,
/// and by hand for handlers that carry state.
pub trait ActionHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        store: &'a mut RequestStore,
        args: BoundArguments,
    ) -> BoxFuture<'a, ActionReturn>;
}

impl<F> ActionHandler for F
where
    F: for<'a> Fn(&'a mut RequestStore, BoundArguments) -> BoxFuture<'a, ActionReturn>
        + Send
        + Sync,
{
    fn call<'a>(
        &'a self,
        store: &'a mut RequestStore,
        args: BoundArguments,
    ) -> BoxFuture<'a, ActionReturn> {
        self(store, args)
    }
}
