use crate::backend::{HookHandle, HotkeyBackend, Signal, Transition};
use crate::center::{self, CenterConfig};
use crate::combination::KeyCombination;
use crate::error::{Error, Result};
use crate::proxy::Identifier;
use crate::store::MemoryStore;
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct FakeState {
    active: Vec<(HookHandle, KeyCombination)>,
    installs: usize,
    max_concurrent: usize,
    fail: bool,
    fail_uninstall: bool,
    queued: Vec<Signal>,
    next_token: u32,
}

/// A scriptable stand-in for the OS hotkey facility. Clones share state, so
/// a test keeps one clone while the center owns another.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Rc<RefCell<FakeState>>,
}

impl FakeBackend {
    /// Installed hooks as (proxy, combination), in install order
    pub fn active(&self) -> Vec<(Identifier, KeyCombination)> {
        self.state
            .borrow()
            .active
            .iter()
            .map(|(handle, combination)| (handle.identifier(), combination.clone()))
            .collect()
    }

    pub fn installs(&self) -> usize {
        self.state.borrow().installs
    }

    /// Most hooks ever active at once
    pub fn max_concurrent(&self) -> usize {
        self.state.borrow().max_concurrent
    }

    pub fn fail_installs(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn fail_uninstalls(&self, fail: bool) {
        self.state.borrow_mut().fail_uninstall = fail;
    }

    pub fn push_signal(&self, identifier: Identifier, transition: Transition) {
        self.state.borrow_mut().queued.push(Signal {
            identifier,
            transition,
        });
    }
}

impl HotkeyBackend for FakeBackend {
    fn install(
        &mut self,
        identifier: Identifier,
        combination: &KeyCombination,
    ) -> Result<HookHandle> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(Error::Install("permission denied".to_string()));
        }
        state.next_token += 1;
        let handle = HookHandle::new(identifier, state.next_token);
        state.active.push((handle, combination.clone()));
        state.installs += 1;
        state.max_concurrent = state.max_concurrent.max(state.active.len());
        Ok(handle)
    }

    fn uninstall(&mut self, handle: HookHandle) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_uninstall {
            return Err(Error::Install("hotkey is busy".to_string()));
        }
        state.active.retain(|(active, _)| *active != handle);
        Ok(())
    }

    fn poll(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.state.borrow_mut().queued)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Give the current test thread a fresh center backed by a fake backend
pub fn setup() -> FakeBackend {
    setup_with_store().0
}

pub fn setup_with_store() -> (FakeBackend, Rc<MemoryStore>) {
    init_tracing();
    let fake = FakeBackend::default();
    let store = Rc::new(MemoryStore::new());
    center::configure(
        CenterConfig::new()
            .with_backend(fake.clone())
            .with_store(store.clone()),
    );
    (fake, store)
}

pub fn combo(s: &str) -> KeyCombination {
    KeyCombination::parse(s).unwrap()
}
