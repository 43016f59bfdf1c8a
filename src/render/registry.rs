use crate::foundation::ids::BackendId;
use crate::render::backend::{BackendDesc, BackendPlugin};
use crate::render::reference::{ReferenceBackendOpts, ReferenceBackendPlugin};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable naming the preferred default backend by display name.
pub const DEFAULT_RENDERER_ENV: &str = "STAGEHAND_DEFAULT_RENDERER";

/// Capability set the orchestrator uses to discover and load backends.
///
/// Injected at construction so hosts and tests can supply their own.
pub trait BackendRegistry: Send + Sync {
    /// Every known backend, in preference order.
    fn list(&self) -> Vec<BackendDesc>;

    /// Description of `id`, if known.
    fn describe(&self, id: &BackendId) -> Option<BackendDesc>;

    /// Backend used when a caller selects the empty id.
    fn default_backend_id(&self) -> Option<BackendId>;

    /// Load `id` and hand out a plugin handle. Every handle must be returned via
    /// [`BackendRegistry::release`].
    fn resolve(&self, id: &BackendId) -> Option<Arc<dyn BackendPlugin>>;

    /// Return a handle obtained from [`BackendRegistry::resolve`].
    fn release(&self, plugin: Arc<dyn BackendPlugin>);
}

struct Entry {
    desc: BackendDesc,
    plugin: Arc<dyn BackendPlugin>,
}

/// In-process registry of statically registered plugins with per-plugin handle counting.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<Entry>,
    handles: Mutex<HashMap<BackendId, usize>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "plugins",
                &self.entries.iter().map(|e| &e.desc).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in reference backend.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        reg.register(
            Arc::new(ReferenceBackendPlugin::new(ReferenceBackendOpts::default())),
            0,
        );
        reg
    }

    /// Register `plugin`. Entries stay sorted by descending priority (stable for ties). A plugin
    /// with an id that is already registered replaces the old entry.
    pub fn register(&mut self, plugin: Arc<dyn BackendPlugin>, priority: i32) {
        let desc = BackendDesc {
            id: plugin.id().clone(),
            display_name: plugin.display_name().to_owned(),
            priority,
        };
        self.entries.retain(|e| e.desc.id != desc.id);
        let at = self
            .entries
            .iter()
            .position(|e| e.desc.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, Entry { desc, plugin });
    }

    /// Handles currently held for `id`.
    pub fn live_handles(&self, id: &BackendId) -> usize {
        self.lock_handles().get(id).copied().unwrap_or(0)
    }

    /// Resolve a display name to an id, falling back to the highest-priority supported plugin.
    pub(crate) fn default_for_display_name(&self, display_name: Option<&str>) -> Option<BackendId> {
        if let Some(name) = display_name.filter(|n| !n.is_empty()) {
            if let Some(e) = self.entries.iter().find(|e| e.desc.display_name == name) {
                return Some(e.desc.id.clone());
            }
            tracing::warn!(
                display_name = name,
                "failed to find default renderer by display name"
            );
        }
        self.entries
            .iter()
            .find(|e| e.plugin.is_supported())
            .map(|e| e.desc.id.clone())
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, HashMap<BackendId, usize>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BackendRegistry for PluginRegistry {
    fn list(&self) -> Vec<BackendDesc> {
        self.entries.iter().map(|e| e.desc.clone()).collect()
    }

    fn describe(&self, id: &BackendId) -> Option<BackendDesc> {
        self.entries
            .iter()
            .find(|e| &e.desc.id == id)
            .map(|e| e.desc.clone())
    }

    fn default_backend_id(&self) -> Option<BackendId> {
        let env = std::env::var(DEFAULT_RENDERER_ENV).ok();
        self.default_for_display_name(env.as_deref())
    }

    fn resolve(&self, id: &BackendId) -> Option<Arc<dyn BackendPlugin>> {
        let entry = self.entries.iter().find(|e| &e.desc.id == id)?;
        *self.lock_handles().entry(id.clone()).or_insert(0) += 1;
        Some(Arc::clone(&entry.plugin))
    }

    fn release(&self, plugin: Arc<dyn BackendPlugin>) {
        let mut handles = self.lock_handles();
        match handles.get_mut(plugin.id()) {
            Some(n) if *n > 0 => *n -= 1,
            _ => tracing::error!(
                backend = %plugin.id(),
                "released a plugin handle that was never resolved"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/registry.rs"]
mod tests;
