//! Module registry and action resolution.
//!
//! # Responsibilities
//! - Hold the action implementations each module exports
//! - Turn `(actionId, scope)` into a callable via the manifest
//! - Cache resolved callables across requests
//!
//! # Design Decisions
//! - Read-mostly: modules are registered at start-up, lookups run concurrently
//! - A miss is `UnknownAction`, which points at a client/server deployment mismatch

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::actions::handler::ActionHandler;
use crate::actions::manifest::{ActionModuleResolver, ModuleReference, WorkerScope};
use crate::error::ActionError;

type ModuleExports = HashMap<String, Arc<dyn ActionHandler>>;

/// Action implementations grouped by the module exporting them.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<ModuleReference, ModuleExports>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `handler` as `action_id` from `module`.
    pub fn register<H>(&self, module: impl Into<ModuleReference>, action_id: impl Into<String>, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(action_id.into(), Arc::new(handler));
    }

    pub fn export(&self, module: &ModuleReference, action_id: &str) -> Option<Arc<dyn ActionHandler>> {
        self.modules.get(module)?.get(action_id).cloned()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.len())
            .finish()
    }
}

/// Resolves action ids to callables for a worker scope.
pub struct ActionResolver {
    manifest: Arc<dyn ActionModuleResolver>,
    modules: Arc<ModuleRegistry>,
    cache: DashMap<(WorkerScope, String), Arc<dyn ActionHandler>>,
}

impl ActionResolver {
    pub fn new(manifest: Arc<dyn ActionModuleResolver>, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            manifest,
            modules,
            cache: DashMap::new(),
        }
    }

    pub fn resolve(&self, action_id: &str, scope: &WorkerScope) -> Result<Arc<dyn ActionHandler>, ActionError> {
        let key = (scope.clone(), action_id.to_string());
        if let Some(handler) = self.cache.get(&key) {
            return Ok(handler.clone());
        }

        let handler = self
            .manifest
            .resolve(action_id, scope)
            .and_then(|module| {
                tracing::trace!(action_id, %scope, %module, "Resolved action module");
                self.modules.export(&module, action_id)
            })
            .ok_or_else(|| {
                tracing::error!(
                    action_id,
                    %scope,
                    "Failed to find server action; the client may be from an older or newer deployment"
                );
                ActionError::UnknownAction {
                    action_id: action_id.to_string(),
                }
            })?;

        self.cache.insert(key, handler.clone());
        Ok(handler)
    }
}

impl fmt::Debug for ActionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionResolver")
            .field("manifest", &self.manifest)
            .field("modules", &self.modules)
            .field("cached", &self.cache.len())
            .finish()
    }
}
