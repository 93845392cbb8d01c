//! Runs an action inside the action phase of the request store.

use crate::actions::args::BoundArguments;
use crate::actions::handler::{ActionHandler, ActionReturn};
use crate::store::RequestStore;

/// Call `handler` exactly once with `args`.
///
/// Cookie writes are allowed for the duration of the call; the previous phase is
/// restored on every exit path.
pub async fn invoke(handler: &dyn ActionHandler, store: &mut RequestStore, args: BoundArguments) -> ActionReturn {
    tracing::debug!(pathname = store.pathname(), args = args.len(), "Invoking server action");
    let mut phase = store.enter_action();
    handler.call(&mut phase, args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::handler::ActionSignal;
    use crate::store::{Phase, ResponseCookie};
    use axum::http::HeaderMap;
    use futures_util::future::BoxFuture;

    fn set_session<'a>(store: &'a mut RequestStore, _args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
        Box::pin(async move {
            assert_eq!(store.phase(), Phase::Action);
            store.cookies_mut()?.set(ResponseCookie::new("session", "abc"));
            Ok(serde_json::json!(null))
        })
    }

    fn fail<'a>(_store: &'a mut RequestStore, _args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
        Box::pin(async { Err(ActionSignal::NotFound(None)) })
    }

    #[tokio::test]
    async fn test_invoke_runs_in_action_phase() {
        let mut store = RequestStore::new("/", &HeaderMap::new());
        let result = invoke(&set_session, &mut store, Vec::new()).await;

        assert!(result.is_ok());
        assert_eq!(store.phase(), Phase::Render);
        assert_eq!(store.cookie("session"), Some("abc"));
    }

    #[tokio::test]
    async fn test_phase_restored_after_signal() {
        let mut store = RequestStore::new("/", &HeaderMap::new());
        let result = invoke(&fail, &mut store, Vec::new()).await;

        assert!(matches!(result, Err(ActionSignal::NotFound(None))));
        assert_eq!(store.phase(), Phase::Render);
    }
}
