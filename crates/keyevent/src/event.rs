use crate::backend::Transition;
use crate::center;
use crate::combination::KeyCombination;
use crate::error::Result;
use crate::name::Name;
use crate::observation::Observation;
use crate::proxy::{EventProxy, Identifier};
use crate::store;
use std::rc::Rc;

/// A global hotkey identified by name.
///
/// `KeyEvent` is a lightweight view: it holds only its [`Name`] and resolves
/// the backing [`EventProxy`] through the thread's registry on every call.
/// Any number of `KeyEvent`s with the same name share one proxy, so handlers
/// registered through one fire for all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    name: Name,
}

impl KeyEvent {
    /// Resolve or create the proxy for `name`.
    ///
    /// On first creation the persisted combination is loaded and installed.
    pub fn new(name: impl Into<Name>) -> Self {
        let name = name.into();
        center::resolve(&name);
        Self { name }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The backing proxy, recreated if it was unregistered
    pub fn proxy(&self) -> Rc<EventProxy> {
        center::resolve(&self.name)
    }

    pub fn identifier(&self) -> Identifier {
        self.proxy().identifier()
    }

    pub fn combination(&self) -> KeyCombination {
        self.proxy().combination()
    }

    /// Change the combination and persist it under the name's storage key.
    ///
    /// The new value is persisted even if the OS refuses to install it; the
    /// install error is still returned.
    pub fn set_combination(&self, combination: KeyCombination) -> Result<()> {
        let applied = self.proxy().set_combination(combination.clone());
        store::save(&*center::persistence(), &self.name, &combination)?;
        applied
    }

    /// Forget the combination, removing the hook and the persisted entry
    pub fn clear(&self) -> Result<()> {
        self.set_combination(KeyCombination::empty())
    }

    pub fn enable(&self) -> Result<()> {
        self.proxy().set_enabled(true)
    }

    /// Suppress the hotkey, tearing down its active hook
    pub fn disable(&self) -> Result<()> {
        self.proxy().set_enabled(false)
    }

    /// Whether the hotkey currently has an active OS hook
    pub fn is_enabled(&self) -> bool {
        self.proxy().is_enabled()
    }

    pub fn observe(&self, transition: Transition, handler: impl Fn() + 'static) -> Observation {
        self.proxy().observe(transition, handler)
    }

    pub fn observe_combination_change(
        &self,
        handler: impl Fn(&KeyCombination) + 'static,
    ) -> Observation {
        self.proxy().observe_combination_change(handler)
    }

    pub fn observe_registration_state_change(
        &self,
        handler: impl Fn(bool) + 'static,
    ) -> Observation {
        self.proxy().observe_registration_state_change(handler)
    }

    pub fn remove_observation(&self, observation: &Observation) -> bool {
        self.proxy().remove_observation(observation)
    }

    /// Tear down the proxy: remove its hook and every handler and drop it
    /// from the registry. The persisted combination is kept, so a later
    /// `KeyEvent::new` with the same name restores it.
    pub fn unregister(&self) -> bool {
        center::find_by_name(&self.name).is_some_and(|proxy| center::unregister(&proxy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::center::CenterConfig;
    use crate::name::Prefix;
    use crate::observation::ObservationCategory;
    use crate::testing::{combo, setup, setup_with_store};
    use std::cell::Cell;

    #[test]
    fn test_distinct_names_distinct_proxies() {
        let _fake = setup();
        let save = KeyEvent::new("save");
        let open = KeyEvent::new("open");
        let prefixed = KeyEvent::new(Name::with_prefix("save", Prefix::new("other_")));

        assert_ne!(save.identifier(), open.identifier());
        assert_ne!(save.identifier(), prefixed.identifier());
        assert!(!Rc::ptr_eq(&save.proxy(), &open.proxy()));
        assert_eq!(center::proxy_count(), 3);
    }

    #[test]
    fn test_same_name_shares_proxy() {
        let _fake = setup();
        let first = KeyEvent::new("save");
        let second = KeyEvent::new("save");
        assert!(Rc::ptr_eq(&first.proxy(), &second.proxy()));
        assert_eq!(center::proxy_count(), 1);

        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        first.observe(Transition::KeyDown, move || counter.set(counter.get() + 1));
        second.set_combination(combo("cmd+s")).unwrap();
        assert!(first.is_enabled());
        center::dispatch(second.identifier(), Transition::KeyDown);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_empty_combination_disables() {
        let fake = setup();
        let save = KeyEvent::new("save");
        save.set_combination(combo("cmd+s")).unwrap();
        assert!(save.is_enabled());
        save.clear().unwrap();
        assert!(!save.is_enabled());

        save.disable().unwrap();
        save.set_combination(KeyCombination::empty()).unwrap();
        assert!(!save.is_enabled());
        save.enable().unwrap();
        assert!(!save.is_enabled());
        assert!(fake.active().is_empty());
    }

    #[test]
    fn test_persist_then_reload() {
        let (fake, store) = setup_with_store();
        KeyEvent::new("save")
            .set_combination(combo("cmd+s"))
            .unwrap();

        // Simulated restart: fresh registry, same store
        configure_fresh(&fake, &store);
        let save = KeyEvent::new("save");
        assert_eq!(save.combination(), combo("cmd+s"));
        assert!(save.is_enabled());
        assert_eq!(fake.active(), vec![(save.identifier(), combo("cmd+s"))]);

        save.clear().unwrap();
        configure_fresh(&fake, &store);
        assert!(KeyEvent::new("save").combination().is_empty());
    }

    fn configure_fresh(
        fake: &crate::testing::FakeBackend,
        store: &Rc<crate::store::MemoryStore>,
    ) {
        center::configure(
            CenterConfig::new()
                .with_backend(fake.clone())
                .with_store(store.clone()),
        );
    }

    #[test]
    fn test_disable_and_enable() {
        let fake = setup();
        let save = KeyEvent::new("save");
        save.set_combination(combo("cmd+s")).unwrap();
        let states = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = states.clone();
        save.observe_registration_state_change(move |enabled| sink.borrow_mut().push(enabled));

        save.disable().unwrap();
        assert!(!save.is_enabled());
        assert!(fake.active().is_empty());
        assert_eq!(save.combination(), combo("cmd+s"));

        save.enable().unwrap();
        assert!(save.is_enabled());
        assert_eq!(*states.borrow(), vec![false, true]);
    }

    #[test]
    fn test_install_failure_is_reported_and_persisted() {
        let (fake, store) = setup_with_store();
        let save = KeyEvent::new("save");
        fake.fail_installs(true);

        assert!(save.set_combination(combo("cmd+s")).is_err());
        assert!(!save.is_enabled());
        assert_eq!(save.combination(), combo("cmd+s"));
        assert_eq!(crate::store::load(&*store, save.name()), combo("cmd+s"));
    }

    #[test]
    fn test_unregister_keeps_persisted_value() {
        let fake = setup();
        let save = KeyEvent::new("save");
        save.set_combination(combo("cmd+s")).unwrap();
        let old = save.identifier();
        let observation = save.observe(Transition::KeyDown, || {});
        assert_eq!(observation.category(), ObservationCategory::KeyEvent);

        assert!(save.unregister());
        assert!(!save.unregister());
        assert!(fake.active().is_empty());
        assert!(!observation.cancel());
        assert_eq!(center::dispatch(old, Transition::KeyDown), 0);

        // The next lookup recreates the proxy from the store
        assert_ne!(save.identifier(), old);
        assert!(save.is_enabled());
        assert_eq!(save.proxy().observation_count(), 0);
    }
}
