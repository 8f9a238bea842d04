use crate::backend::{HookHandle, Transition};
use crate::center;
use crate::combination::KeyCombination;
use crate::error::Result;
use crate::name::Name;
use crate::observation::{Observation, ObservationCategory, ObservationKind};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Process-unique handle of a proxy, carried by OS signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(u32);

impl Identifier {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the proxy currently holds an OS hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Uninstalled,
    Installed,
}

pub type KeyHandler = Rc<dyn Fn()>;
pub type CombinationHandler = Rc<dyn Fn(&KeyCombination)>;
pub type StateHandler = Rc<dyn Fn(bool)>;

#[derive(Clone)]
enum Handler {
    Key(KeyHandler),
    Combination(CombinationHandler),
    State(StateHandler),
}

struct Entry {
    observation: Observation,
    handler: Handler,
}

struct ProxyState {
    combination: KeyCombination,
    enabled: bool,
    /// The installed hook and the combination it was installed with
    hook: Option<(HookHandle, KeyCombination)>,
    next_token: u64,
    observers: Vec<Entry>,
}

/// Owner of the OS hook for one named hotkey.
///
/// A hook is wanted when the proxy is enabled and its combination is
/// non-empty; a failed install leaves it wanted but absent, so the next
/// change retries. Proxies live in the thread's registry; everything else
/// refers to them by name or identifier.
pub struct EventProxy {
    identifier: Identifier,
    name: Name,
    state: RefCell<ProxyState>,
}

impl fmt::Debug for EventProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventProxy")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .field("combination", &state.combination)
            .field("enabled", &state.enabled)
            .field("hook", &state.hook)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl EventProxy {
    /// A new, uninstalled and enabled proxy
    pub fn new(identifier: Identifier, name: Name, combination: KeyCombination) -> Self {
        Self {
            identifier,
            name,
            state: RefCell::new(ProxyState {
                combination,
                enabled: true,
                hook: None,
                next_token: 0,
                observers: Vec::new(),
            }),
        }
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn combination(&self) -> KeyCombination {
        self.state.borrow().combination.clone()
    }

    /// True when the proxy holds an active OS hook
    pub fn is_enabled(&self) -> bool {
        let state = self.state.borrow();
        state.enabled && state.hook.is_some()
    }

    pub fn registration_state(&self) -> RegistrationState {
        if self.state.borrow().hook.is_some() {
            RegistrationState::Installed
        } else {
            RegistrationState::Uninstalled
        }
    }

    /// Replace the combination, re-installing the hook to match.
    ///
    /// Any previous hook is removed before the new one is installed.
    /// Combination observers are told about the change even when the
    /// install fails; in that case the proxy is left without a hook and the
    /// error is returned.
    pub fn set_combination(&self, combination: KeyCombination) -> Result<()> {
        let was_enabled = self.is_enabled();
        let changed = {
            let mut state = self.state.borrow_mut();
            let changed = state.combination != combination;
            state.combination = combination.clone();
            changed
        };

        let result = self.reconcile(true);
        if changed {
            self.notify_combination(&combination);
        }
        self.notify_if_state_changed(was_enabled);
        result
    }

    /// Enable or suppress the hotkey without forgetting its combination
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let was_enabled = self.is_enabled();
        self.state.borrow_mut().enabled = enabled;
        let result = self.reconcile(false);
        self.notify_if_state_changed(was_enabled);
        result
    }

    /// Bring the hook in line with (combination, enabled).
    ///
    /// With `force`, an existing hook is replaced even if it already matches
    /// the combination.
    /// A hook that fails to uninstall stays recorded on the proxy, and the
    /// error is returned without installing a replacement.
    pub(crate) fn reconcile(&self, force: bool) -> Result<()> {
        let (stale, wanted) = {
            let state = self.state.borrow();
            let wanted = (state.enabled && !state.combination.is_empty())
                .then(|| state.combination.clone());
            let current = state.hook.as_ref().map(|(_, installed)| installed);
            if !force && wanted.is_some() && current == wanted.as_ref() {
                return Ok(());
            }
            (state.hook.as_ref().map(|(handle, _)| *handle), wanted)
        };

        if let Some(handle) = stale {
            if let Err(e) = center::uninstall_hook(handle) {
                warn!("Failed to uninstall hook for '{}': {}", self.name, e);
                return Err(e);
            }
            self.state.borrow_mut().hook = None;
        }

        let Some(combination) = wanted else {
            return Ok(());
        };
        match center::install_hook(self.identifier, &combination) {
            Ok(handle) => {
                debug!("Installed {} for '{}' ({})", combination, self.name, self.identifier);
                self.state.borrow_mut().hook = Some((handle, combination));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to install {} for '{}': {}", combination, self.name, e);
                Err(e)
            }
        }
    }

    /// Remove the hook and every observer. The proxy keeps its combination.
    pub(crate) fn teardown(&self) {
        let (hook, observers) = {
            let mut state = self.state.borrow_mut();
            (state.hook.take(), std::mem::take(&mut state.observers))
        };
        if let Some((handle, _)) = hook {
            if let Err(e) = center::uninstall_hook(handle) {
                warn!("Failed to uninstall hook for '{}': {}", self.name, e);
            }
        }
        drop(observers);
    }

    /// Register a handler for key signals of this proxy's hook.
    ///
    /// Handlers run in registration order.
    pub fn observe(&self, transition: Transition, handler: impl Fn() + 'static) -> Observation {
        self.add_observer(ObservationKind::Key(transition), Handler::Key(Rc::new(handler)))
    }

    pub fn observe_combination_change(
        &self,
        handler: impl Fn(&KeyCombination) + 'static,
    ) -> Observation {
        self.add_observer(
            ObservationKind::Combination,
            Handler::Combination(Rc::new(handler)),
        )
    }

    /// Handlers receive the new value of [`EventProxy::is_enabled`]
    pub fn observe_registration_state_change(
        &self,
        handler: impl Fn(bool) + 'static,
    ) -> Observation {
        self.add_observer(
            ObservationKind::RegistrationState,
            Handler::State(Rc::new(handler)),
        )
    }

    fn add_observer(&self, kind: ObservationKind, handler: Handler) -> Observation {
        let mut state = self.state.borrow_mut();
        state.next_token += 1;
        let observation = Observation::new(self.identifier, state.next_token, kind);
        state.observers.push(Entry {
            observation,
            handler,
        });
        observation
    }

    /// Cancel one handler. Returns false if it was not registered here.
    pub fn remove_observation(&self, observation: &Observation) -> bool {
        !self
            .take_observers(|entry| entry.observation == *observation)
            .is_empty()
    }

    /// Cancel every handler in `category`
    pub fn remove_observations(&self, category: ObservationCategory) -> usize {
        self.take_observers(|entry| entry.observation.category() == category)
            .len()
    }

    /// Detach matching entries; the caller drops them after the borrow ends,
    /// since a handler's captures may call back into this proxy on drop.
    fn take_observers(&self, matches: impl Fn(&Entry) -> bool) -> Vec<Entry> {
        let mut state = self.state.borrow_mut();
        let (removed, kept): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut state.observers)
            .into_iter()
            .partition(|entry| matches(entry));
        state.observers = kept;
        removed
    }

    pub fn observation_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Run the handlers for an OS key signal. Signals that arrive while the
    /// proxy is disabled or has no hook are dropped.
    pub(crate) fn dispatch(&self, transition: Transition) -> usize {
        if !self.is_enabled() {
            debug!("Dropping {:?} for '{}': not enabled", transition, self.name);
            return 0;
        }
        let handlers: Vec<KeyHandler> = self
            .snapshot(ObservationKind::Key(transition))
            .into_iter()
            .filter_map(|handler| match handler {
                Handler::Key(handler) => Some(handler),
                _ => None,
            })
            .collect();
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    fn notify_combination(&self, combination: &KeyCombination) {
        for handler in self.snapshot(ObservationKind::Combination) {
            if let Handler::Combination(handler) = handler {
                handler(combination);
            }
        }
    }

    fn notify_if_state_changed(&self, was_enabled: bool) {
        let enabled = self.is_enabled();
        if enabled == was_enabled {
            return;
        }
        for handler in self.snapshot(ObservationKind::RegistrationState) {
            if let Handler::State(handler) = handler {
                handler(enabled);
            }
        }
    }

    /// Handlers are cloned out first so they may re-enter the proxy.
    fn snapshot(&self, kind: ObservationKind) -> Vec<Handler> {
        self.state
            .borrow()
            .observers
            .iter()
            .filter(|entry| entry.observation.kind() == kind)
            .map(|entry| entry.handler.clone())
            .collect()
    }
}
