use crate::error::{Error, Result};
use crate::name::Name;
use crate::proxy::{EventProxy, Identifier};
use std::collections::HashMap;
use std::rc::Rc;

/// The set of live proxies, indexed both by identifier and by name.
///
/// `proxies` owns every proxy; `names` is a secondary index kept in step with
/// it on every insert and removal. Identifiers and names are each unique
/// across the stored proxies, so both lookups always agree.
#[derive(Default)]
pub struct ProxyStorage {
    proxies: HashMap<Identifier, Rc<EventProxy>>,
    names: HashMap<Name, Identifier>,
}

impl ProxyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a proxy, replacing the slot with the same identifier and name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if a different proxy already holds the
    /// identifier or the name.
    pub fn register(&mut self, proxy: Rc<EventProxy>) -> Result<()> {
        let identifier = proxy.identifier();
        if let Some(existing) = self.names.get(proxy.name()) {
            if *existing != identifier {
                return Err(Error::Conflict(format!(
                    "name '{}' already belongs to proxy {existing}",
                    proxy.name()
                )));
            }
        }
        if let Some(existing) = self.proxies.get(&identifier) {
            if existing.name() != proxy.name() {
                return Err(Error::Conflict(format!(
                    "identifier {identifier} already belongs to '{}'",
                    existing.name()
                )));
            }
        }

        self.names.insert(proxy.name().clone(), identifier);
        self.proxies.insert(identifier, proxy);
        Ok(())
    }

    pub fn find(&self, identifier: Identifier) -> Option<Rc<EventProxy>> {
        self.proxies.get(&identifier).cloned()
    }

    pub fn find_by_name(&self, name: &Name) -> Option<Rc<EventProxy>> {
        self.names
            .get(name)
            .and_then(|identifier| self.find(*identifier))
    }

    /// Remove the slot whose identifier and name both match `proxy`
    pub fn unregister(&mut self, proxy: &EventProxy) -> Option<Rc<EventProxy>> {
        let identifier = proxy.identifier();
        if self.names.get(proxy.name()) != Some(&identifier) {
            return None;
        }
        self.names.remove(proxy.name());
        self.proxies.remove(&identifier)
    }

    /// Empty the storage, handing back every proxy it held
    pub fn drain(&mut self) -> Vec<Rc<EventProxy>> {
        self.names.clear();
        self.proxies.drain().map(|(_, proxy)| proxy).collect()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
