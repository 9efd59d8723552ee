use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;

use crate::error::ResolveError;
use crate::prototype::Prototype;

type Slot = Arc<OnceCell<Arc<Prototype>>>;

/// Type name to prototype cache of one session.
///
/// Each type name owns a slot that is filled at most once. The map lock only
/// guards slot lookup; building happens outside it, and a second caller
/// asking for a type that is being built waits for that build instead of
/// starting its own. A failed build leaves the slot empty so a later request
/// can try again.
#[derive(Debug, Default)]
pub struct PrototypeRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, type_name: &str) -> Slot {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_name.to_string())
            .or_default()
            .clone()
    }

    /// The prototype registered for `type_name`, if one was built.
    pub fn get(&self, type_name: &str) -> Option<Arc<Prototype>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(type_name).and_then(|slot| slot.get().cloned())
    }

    /// Return the prototype for `type_name`, running `build` on a miss.
    pub fn get_or_try_build<F>(&self, type_name: &str, build: F) -> Result<Arc<Prototype>, ResolveError>
    where
        F: FnOnce() -> Result<Prototype, ResolveError>,
    {
        let slot = self.slot(type_name);
        if let Some(prototype) = slot.get() {
            log::debug!("Prototype cache hit: {type_name}");
            return Ok(prototype.clone());
        }

        slot.get_or_try_init(|| {
            log::debug!("Prototype cache miss: {type_name}");
            build().map(Arc::new).inspect_err(|e| {
                log::debug!("Building {type_name} failed, leaving it unregistered: {e}");
            })
        })
        .cloned()
    }

    /// Type names with a built prototype, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.type_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The chain of type names a single resolution request is currently
/// building, used to reject a prototype that contains itself.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    chain: Vec<String>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Enter `type_name`; fails if it is already being built further up.
    pub fn push(&mut self, type_name: &str) -> Result<(), ResolveError> {
        if self.chain.iter().any(|t| t == type_name) {
            let mut chain = self.chain.clone();
            chain.push(type_name.to_string());
            return Err(ResolveError::CyclicDefinition {
                type_name: type_name.to_string(),
                chain,
            });
        }
        self.chain.push(type_name.to_string());
        Ok(())
    }

    pub fn pop(&mut self) {
        self.chain.pop();
    }
}
