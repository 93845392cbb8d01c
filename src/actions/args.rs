//! Decoded action arguments.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::actions::handler::{ActionHandler, ActionReturn};
use crate::actions::invoker;
use crate::decode::form::FormData;
use crate::store::RequestStore;

/// Positional arguments passed to an action.
pub type BoundArguments = Vec<ActionArg>;

/// One decoded argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionArg {
    /// A plain JSON value.
    Json(JsonValue),
    /// A form-data object.
    Form(FormData),
    /// Another server action, possibly with arguments already bound.
    Action(BoundAction),
}

impl ActionArg {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            ActionArg::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&FormData> {
        match self {
            ActionArg::Form(form) => Some(form),
            _ => None,
        }
    }

    /// JSON view of the argument. Bound actions render as `{"$action": id}`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ActionArg::Json(value) => value.clone(),
            ActionArg::Form(form) => form.to_json(),
            ActionArg::Action(action) => serde_json::json!({ "$action": action.id() }),
        }
    }
}

impl From<JsonValue> for ActionArg {
    fn from(value: JsonValue) -> Self {
        ActionArg::Json(value)
    }
}

/// A resolved server action with leading arguments already bound.
#[derive(Clone)]
pub struct BoundAction {
    id: String,
    bound: BoundArguments,
    handler: Arc<dyn ActionHandler>,
}

impl BoundAction {
    pub fn new(id: impl Into<String>, handler: Arc<dyn ActionHandler>, bound: BoundArguments) -> Self {
        Self {
            id: id.into(),
            bound,
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bound(&self) -> &[ActionArg] {
        &self.bound
    }

    /// Call the action with the bound arguments followed by `args`.
    pub async fn call(&self, store: &mut RequestStore, args: BoundArguments) -> ActionReturn {
        let mut all = self.bound.clone();
        all.extend(args);
        invoker::invoke(self.handler.as_ref(), store, all).await
    }
}

impl PartialEq for BoundAction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.bound == other.bound
    }
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("id", &self.id)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}
