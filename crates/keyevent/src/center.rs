//! The per-thread hub: proxy registry, OS backend and persistence store.
//!
//! All key event state lives on the main (UI) thread, which is also where the
//! OS delivers hotkey callbacks, so the hub is a thread-local rather than a
//! locked global. Nothing here blocks.

use crate::backend::{GlobalHotkeyBackend, HookHandle, HotkeyBackend, Transition};
use crate::combination::KeyCombination;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::proxy::{EventProxy, Identifier};
use crate::storage::ProxyStorage;
use crate::store::{self, KeyValueStore, MemoryStore};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Configuration for the thread's key event hub
#[derive(Default)]
pub struct CenterConfig {
    backend: Option<Box<dyn HotkeyBackend>>,
    store: Option<Rc<dyn KeyValueStore>>,
}

impl CenterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this backend instead of the lazily created [`GlobalHotkeyBackend`]
    pub fn with_backend(mut self, backend: impl HotkeyBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Persist combinations here instead of in memory
    pub fn with_store(mut self, store: Rc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }
}

struct Center {
    proxies: ProxyStorage,
    backend: Option<Box<dyn HotkeyBackend>>,
    store: Rc<dyn KeyValueStore>,
    next_identifier: u32,
}

impl Center {
    fn new(config: CenterConfig) -> Self {
        Self {
            proxies: ProxyStorage::new(),
            backend: config.backend,
            store: config
                .store
                .unwrap_or_else(|| Rc::new(MemoryStore::new())),
            next_identifier: 0,
        }
    }

    fn backend(&mut self) -> Result<&mut Box<dyn HotkeyBackend>> {
        if self.backend.is_none() {
            info!("Creating global hotkey backend");
            self.backend = Some(Box::new(GlobalHotkeyBackend::new()?));
        }
        self.backend
            .as_mut()
            .ok_or_else(|| Error::Install("no hotkey backend available".to_string()))
    }
}

thread_local! {
    static CENTER: RefCell<Center> = RefCell::new(Center::new(CenterConfig::default()));
}

fn with<R>(f: impl FnOnce(&mut Center) -> R) -> R {
    CENTER.with(|center| f(&mut center.borrow_mut()))
}

/// Replace the thread's backend and store, starting from an empty registry.
///
/// Existing proxies are torn down first, releasing their OS hooks.
pub fn configure(config: CenterConfig) {
    shutdown();
    let previous = with(|center| std::mem::replace(center, Center::new(config)));
    drop(previous);
    debug!("Key event center configured");
}

/// Tear down every proxy and empty the registry. Persisted combinations are
/// kept.
pub fn shutdown() {
    let proxies = with(|center| center.proxies.drain());
    if !proxies.is_empty() {
        info!("Tearing down {} key event proxies", proxies.len());
    }
    for proxy in proxies {
        proxy.teardown();
    }
}

/// Drain signals from the backend and dispatch them. Returns the number of
/// signals received.
pub fn pump() -> usize {
    let signals = with(|center| {
        center
            .backend
            .as_mut()
            .map(|backend| backend.poll())
            .unwrap_or_default()
    });
    for signal in &signals {
        dispatch(signal.identifier, signal.transition);
    }
    signals.len()
}

/// Deliver an OS key signal to the proxy with `identifier`.
///
/// Signals for unknown identifiers are dropped. Returns how many handlers ran.
pub fn dispatch(identifier: Identifier, transition: Transition) -> usize {
    match find(identifier) {
        Some(proxy) => proxy.dispatch(transition),
        None => {
            debug!("Dropping {:?} for unknown proxy {}", transition, identifier);
            0
        }
    }
}

/// Look up a live proxy. Also safe to call from thread-local destructors,
/// where it finds nothing once the hub is gone.
pub fn find(identifier: Identifier) -> Option<Rc<EventProxy>> {
    CENTER
        .try_with(|center| center.borrow().proxies.find(identifier))
        .ok()
        .flatten()
}

pub fn find_by_name(name: &Name) -> Option<Rc<EventProxy>> {
    with(|center| center.proxies.find_by_name(name))
}

pub fn proxy_count() -> usize {
    with(|center| center.proxies.len())
}

/// The proxy for `name`, created and registered on first use.
///
/// A new proxy starts from the combination persisted under the name's
/// storage key and installs it right away. Install failures are logged and
/// leave the proxy disabled.
pub(crate) fn resolve(name: &Name) -> Rc<EventProxy> {
    if let Some(proxy) = find_by_name(name) {
        return proxy;
    }

    let combination = store::load(&*persistence(), name);
    let proxy = with(|center| {
        // Identifiers are never reused; a thread cannot create 2^32 proxies
        center.next_identifier += 1;
        let proxy = Rc::new(EventProxy::new(
            Identifier::new(center.next_identifier),
            name.clone(),
            combination,
        ));
        if let Err(e) = center.proxies.register(proxy.clone()) {
            warn!("Failed to register proxy for '{}': {}", name, e);
        }
        proxy
    });
    info!("Created proxy {} for '{}'", proxy.identifier(), name);

    if let Err(e) = proxy.reconcile(false) {
        warn!("Could not restore hotkey for '{}': {}", name, e);
    }
    proxy
}

/// Remove a proxy from the registry and tear it down
pub(crate) fn unregister(proxy: &EventProxy) -> bool {
    match with(|center| center.proxies.unregister(proxy)) {
        Some(removed) => {
            removed.teardown();
            info!("Unregistered proxy {} for '{}'", removed.identifier(), removed.name());
            true
        }
        None => false,
    }
}

pub(crate) fn persistence() -> Rc<dyn KeyValueStore> {
    with(|center| center.store.clone())
}

pub(crate) fn install_hook(
    identifier: Identifier,
    combination: &KeyCombination,
) -> Result<HookHandle> {
    with(|center| center.backend()?.install(identifier, combination))
}

pub(crate) fn uninstall_hook(handle: HookHandle) -> Result<()> {
    with(|center| match center.backend.as_mut() {
        Some(backend) => backend.uninstall(handle),
        None => Ok(()),
    })
}
