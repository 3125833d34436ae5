//! Concurrent mapping from renderer name to backend handle.
//!
//! The registry is the single source of truth for what can be cast to right
//! now. The discovery bridge is its only writer; the command dispatcher reads
//! from it. Every operation takes the same lock, so reads and writes are
//! linearizable with respect to each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cast::RendererHandle;

/// A renderer known to the registry.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Registry key.
    pub name: String,
    /// Backend handle, shared with the registry.
    pub handle: Arc<RendererHandle>,
}

/// What [`RendererRegistry::add`] displaced.
#[derive(Debug, Default)]
pub struct Displaced {
    /// Handle previously registered under the same name.
    pub replaced: Option<Arc<RendererHandle>>,
    /// Earlier name of the same renderer, when it was registered under a
    /// different name before. That entry is gone.
    pub renamed_from: Option<String>,
}

/// Name → handle map of currently available renderers.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: Mutex<HashMap<String, Arc<RendererHandle>>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the renderer registered under `name`.
    ///
    /// A renderer is registered under one name at a time: if the same backend
    /// id is already present under another name, that entry is dropped.
    pub fn add(&self, name: impl Into<String>, handle: Arc<RendererHandle>) -> Displaced {
        let name = name.into();
        let mut renderers = self.renderers.lock();

        let renamed_from = renderers
            .iter()
            .find(|(key, existing)| **key != name && existing.id() == handle.id())
            .map(|(key, _)| key.clone());
        if let Some(old_name) = &renamed_from {
            renderers.remove(old_name);
        }
        let replaced = renderers.insert(name.clone(), handle);
        drop(renderers);

        if let Some(old_name) = &renamed_from {
            log::info!("[Registry] Renderer {} renamed to {}", old_name, name);
        } else if replaced.is_some() {
            log::debug!("[Registry] Replaced renderer {}", name);
        } else {
            log::info!("[Registry] Added renderer {}", name);
        }
        Displaced {
            replaced,
            renamed_from,
        }
    }

    /// Removes the renderer registered under `name`. Absent names are a no-op.
    pub fn remove(&self, name: &str) -> Option<Renderer> {
        let removed = self.renderers.lock().remove_entry(name);
        match removed {
            Some((name, handle)) => {
                log::info!("[Registry] Removed renderer {}", name);
                Some(Renderer { name, handle })
            }
            None => {
                log::debug!("[Registry] Remove of unknown renderer {} ignored", name);
                None
            }
        }
    }

    /// Removes `name` only while it still refers to `handle`'s renderer.
    ///
    /// A removal for a renderer whose name has since been taken over by
    /// another device leaves the live entry alone and returns `None`.
    pub fn remove_if(&self, name: &str, handle: &RendererHandle) -> Option<Renderer> {
        let mut renderers = self.renderers.lock();
        match renderers.get(name) {
            Some(current) if current.id() == handle.id() => {}
            Some(_) => {
                log::debug!(
                    "[Registry] Stale remove of {} ({}) ignored",
                    name,
                    handle.id()
                );
                return None;
            }
            None => return None,
        }
        let (name, handle) = renderers.remove_entry(name)?;
        drop(renderers);

        log::info!("[Registry] Removed renderer {}", name);
        Some(Renderer { name, handle })
    }

    /// Returns the renderer registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Renderer> {
        self.renderers.lock().get(name).map(|handle| Renderer {
            name: name.to_string(),
            handle: Arc::clone(handle),
        })
    }

    pub fn len(&self) -> usize {
        self.renderers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.lock().is_empty()
    }

    /// Sorted snapshot of registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.renderers.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
