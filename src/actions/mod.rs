//! Server actions: resolution, invocation and outcome handling.
//!
//! # Data Flow
//! ```text
//! dispatcher.rs
//!     → registry.rs (manifest.rs: action id + worker scope → module → handler)
//!     → invoker.rs (handler.rs callable, args.rs arguments, action phase)
//!     → outcome.rs (success / redirect / not-found / failure)
//! ```

pub mod args;
pub mod dispatcher;
pub mod handler;
pub mod invoker;
pub mod manifest;
pub mod outcome;
pub mod registry;

pub use args::{ActionArg, BoundAction, BoundArguments};
pub use dispatcher::{ActionDispatcher, Dispatch};
pub use handler::{ActionHandler, ActionReturn, ActionSignal, RedirectSignal};
pub use manifest::{ActionManifest, ActionModuleResolver, ManifestError, ModuleReference, WorkerScope};
pub use outcome::Outcome;
pub use registry::{ActionResolver, ModuleRegistry};
