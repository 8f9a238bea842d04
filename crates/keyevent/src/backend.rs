//! The OS hotkey facility.
//!
//! Proxies install and remove hooks through a [`HotkeyBackend`]. The backend
//! reports key transitions as [`Signal`]s carrying only the proxy
//! [`Identifier`]; [`crate::center::pump`] routes them back to the proxy.

use crate::combination::KeyCombination;
use crate::error::{Error, Result};
use crate::proxy::Identifier;
use global_hotkey::{hotkey::HotKey, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Direction of a key signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    KeyDown,
    KeyUp,
}

/// A key transition delivered by the OS for one installed hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub identifier: Identifier,
    pub transition: Transition,
}

/// Opaque token for an installed hook, returned by [`HotkeyBackend::install`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle {
    identifier: Identifier,
    token: u32,
}

impl HookHandle {
    /// Backends build handles from the proxy identifier and their own token
    pub fn new(identifier: Identifier, token: u32) -> Self {
        Self { identifier, token }
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn token(&self) -> u32 {
        self.token
    }
}

/// Installs and removes global hotkey hooks
pub trait HotkeyBackend {
    /// Install a hook for `combination` on behalf of the proxy `identifier`.
    ///
    /// Callers never pass an empty combination.
    fn install(&mut self, identifier: Identifier, combination: &KeyCombination)
        -> Result<HookHandle>;

    fn uninstall(&mut self, handle: HookHandle) -> Result<()>;

    /// Drain the signals delivered since the last poll
    fn poll(&mut self) -> Vec<Signal>;
}

/// A [`HotkeyBackend`] over `global_hotkey`.
///
/// Must be created and used on the main thread.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    /// Maps the OS hotkey id to the owning proxy and its registration
    hooks: HashMap<u32, (Identifier, HotKey)>,
}

impl GlobalHotkeyBackend {
    /// Creates a new backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying global hotkey manager fails to initialize.
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| Error::Install(format!("Failed to create hotkey manager: {e}")))?;
        Ok(Self {
            manager,
            hooks: HashMap::new(),
        })
    }

    fn translate(&self, event: &GlobalHotKeyEvent) -> Option<Signal> {
        let (identifier, _) = self.hooks.get(&event.id)?;
        let transition = match event.state {
            HotKeyState::Pressed => Transition::KeyDown,
            HotKeyState::Released => Transition::KeyUp,
        };
        Some(Signal {
            identifier: *identifier,
            transition,
        })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn install(
        &mut self,
        identifier: Identifier,
        combination: &KeyCombination,
    ) -> Result<HookHandle> {
        let hotkey = combination
            .to_hotkey()
            .ok_or_else(|| Error::Install("cannot install an empty combination".to_string()))?;

        self.manager.register(hotkey)?;
        self.hooks.insert(hotkey.id(), (identifier, hotkey));
        debug!("Registered {} for proxy {} (os id {})", combination, identifier, hotkey.id());

        Ok(HookHandle::new(identifier, hotkey.id()))
    }

    /// The hook stays tracked until the OS has released it
    fn uninstall(&mut self, handle: HookHandle) -> Result<()> {
        let Some(&(identifier, hotkey)) = self.hooks.get(&handle.token()) else {
            return Ok(());
        };
        self.manager.unregister(hotkey)?;
        self.hooks.remove(&handle.token());
        debug!("Unregistered hotkey for proxy {} (os id {})", identifier, handle.token());
        Ok(())
    }

    fn poll(&mut self) -> Vec<Signal> {
        let mut signals = Vec::new();
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            match self.translate(&event) {
                Some(signal) => signals.push(signal),
                None => trace!("Ignoring event for unknown os id {}", event.id),
            }
        }
        signals
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        for (_, (_, hotkey)) in self.hooks.drain() {
            let _ = self.manager.unregister(hotkey);
        }
    }
}
