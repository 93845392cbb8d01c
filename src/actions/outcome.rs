//! Classification of an action's result.

use serde_json::Value as JsonValue;

use crate::actions::handler::{ActionReturn, ActionSignal, RedirectSignal};
use crate::error::ActionError;

/// How an action call ended.
#[derive(Debug)]
pub enum Outcome {
    Success(JsonValue),
    Redirect(RedirectSignal),
    NotFound(Option<String>),
    Failure(ActionError),
}

impl Outcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Redirect(_) => "redirect",
            Outcome::NotFound(_) => "not_found",
            Outcome::Failure(_) => "failure",
        }
    }
}

impl From<ActionError> for Outcome {
    fn from(err: ActionError) -> Self {
        Outcome::Failure(err)
    }
}

/// Map an action return onto exactly one outcome.
pub fn classify(result: ActionReturn) -> Outcome {
    match result {
        Ok(value) => Outcome::Success(value),
        Err(ActionSignal::Redirect(signal)) => Outcome::Redirect(signal),
        Err(ActionSignal::NotFound(message)) => Outcome::NotFound(message),
        Err(ActionSignal::Error(err)) => Outcome::Failure(ActionError::Action(err)),
    }
}
