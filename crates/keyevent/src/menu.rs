//! Routing a menu item through a key event.
//!
//! Attaching an event to a menu item mirrors the event's combination into
//! the item's key equivalent, wraps the item's action so an extra handler
//! runs while the event is enabled, and fires the item's action when the
//! global hotkey goes down. Detaching restores the item exactly as it was.
//! All attachment state lives in a side table keyed by the item, so the
//! item type needs no extra fields.

use crate::association::AssociationStore;
use crate::backend::Transition;
use crate::center;
use crate::combination::KeyCombination;
use crate::event::KeyEvent;
use crate::name::Name;
use crate::observation::ObservationSet;
use global_hotkey::hotkey::Modifiers;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

pub type Action = Rc<dyn Fn()>;

const NAME_KEY: &str = "keyevent.name";
const HANDLER_KEY: &str = "keyevent.handler";
const ORIGINAL_KEY: &str = "keyevent.original";
const OBSERVATIONS_KEY: &str = "keyevent.observations";

/// The shortcut text a menu shows next to an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEquivalent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl Default for KeyEquivalent {
    fn default() -> Self {
        Self {
            key: String::new(),
            modifiers: Modifiers::empty(),
        }
    }
}

impl From<&KeyCombination> for KeyEquivalent {
    fn from(combination: &KeyCombination) -> Self {
        match combination.key_equivalent() {
            Some(key) => Self {
                key: key.to_string(),
                modifiers: combination.modifiers,
            },
            None => Self::default(),
        }
    }
}

/// The parts of a toolkit menu item a key event drives
pub trait MenuItem: 'static {
    fn action(&self) -> Option<Action>;
    fn set_action(&self, action: Option<Action>);
    fn key_equivalent(&self) -> KeyEquivalent;
    fn set_key_equivalent(&self, equivalent: KeyEquivalent);
}

#[derive(Clone)]
struct Original {
    action: Option<Action>,
    key_equivalent: KeyEquivalent,
}

thread_local! {
    static ATTACHMENTS: RefCell<AssociationStore> = RefCell::new(AssociationStore::new());
}

fn with<R>(f: impl FnOnce(&mut AssociationStore) -> R) -> R {
    ATTACHMENTS.with(|store| f(&mut store.borrow_mut()))
}

/// Attach `event` to `item`, with an optional extra handler run after the
/// item's own action while the event is enabled.
///
/// Re-attaching first restores the item, so the saved original is always
/// the pre-attachment state.
pub fn attach<I: MenuItem>(item: &Rc<I>, event: &KeyEvent, handler: Option<Action>) {
    detach(item);

    let original = Original {
        action: item.action(),
        key_equivalent: item.key_equivalent(),
    };
    let name = event.name().clone();

    let inner = original.action.clone();
    let extra = handler.clone();
    let gate = name.clone();
    let combined: Action = Rc::new(move || {
        if let Some(action) = &inner {
            action();
        }
        if let Some(extra) = &extra {
            if center::find_by_name(&gate).is_some_and(|proxy| proxy.is_enabled()) {
                extra();
            }
        }
    });
    item.set_action(Some(combined));
    item.set_key_equivalent(KeyEquivalent::from(&event.combination()));

    let mut observations = ObservationSet::new();
    let weak: Weak<I> = Rc::downgrade(item);
    observations.add(event.observe_combination_change(move |combination| {
        if let Some(item) = weak.upgrade() {
            item.set_key_equivalent(KeyEquivalent::from(combination));
        }
    }));
    let weak: Weak<I> = Rc::downgrade(item);
    observations.add(event.observe(Transition::KeyDown, move || {
        if let Some(action) = weak.upgrade().and_then(|item| item.action()) {
            action();
        }
    }));

    with(|store| {
        store.set(item, NAME_KEY, name.clone());
        if let Some(handler) = handler {
            store.set(item, HANDLER_KEY, handler);
        }
        store.set(item, ORIGINAL_KEY, original);
        store.set(item, OBSERVATIONS_KEY, observations);
    });
    debug!("Attached key event '{}' to menu item", name);
}

/// The key event attached to `item`, if any
pub fn attached<I: MenuItem>(item: &Rc<I>) -> Option<KeyEvent> {
    with(|store| store.get::<I, Name>(item, NAME_KEY)).map(KeyEvent::new)
}

/// The extra handler attached alongside the event, if any
pub fn handler<I: MenuItem>(item: &Rc<I>) -> Option<Action> {
    with(|store| store.get::<I, Action>(item, HANDLER_KEY))
}

/// Detach the key event from `item`, restoring its original action and key
/// equivalent. Returns false if nothing was attached.
pub fn detach<I: MenuItem>(item: &Rc<I>) -> bool {
    let (name, original, observations) = with(|store| {
        let _ = store.remove::<I, Action>(item, HANDLER_KEY);
        (
            store.remove::<I, Name>(item, NAME_KEY),
            store.remove::<I, Original>(item, ORIGINAL_KEY),
            store.remove::<I, ObservationSet>(item, OBSERVATIONS_KEY),
        )
    });
    drop(observations);

    let Some(original) = original else {
        return false;
    };
    item.set_action(original.action);
    item.set_key_equivalent(original.key_equivalent);
    if let Some(name) = name {
        debug!("Detached key event '{}' from menu item", name);
    }
    true
}

/// Forget attachments of menu items that no longer exist
pub fn sweep() -> usize {
    let dead = with(|store| store.sweep());
    dead.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{combo, setup};
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeItem {
        action: RefCell<Option<Action>>,
        key_equivalent: RefCell<KeyEquivalent>,
    }

    impl MenuItem for FakeItem {
        fn action(&self) -> Option<Action> {
            self.action.borrow().clone()
        }

        fn set_action(&self, action: Option<Action>) {
            *self.action.borrow_mut() = action;
        }

        fn key_equivalent(&self) -> KeyEquivalent {
            self.key_equivalent.borrow().clone()
        }

        fn set_key_equivalent(&self, equivalent: KeyEquivalent) {
            *self.key_equivalent.borrow_mut() = equivalent;
        }
    }

    fn counter() -> (Rc<Cell<u32>>, Action) {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        (hits, Rc::new(move || counter.set(counter.get() + 1)))
    }

    fn item_with_action() -> (Rc<FakeItem>, Rc<Cell<u32>>, Action) {
        let (hits, action) = counter();
        let item = Rc::new(FakeItem::default());
        item.set_action(Some(action.clone()));
        item.set_key_equivalent(KeyEquivalent {
            key: "q".to_string(),
            modifiers: Modifiers::SUPER,
        });
        (item, hits, action)
    }

    fn perform(item: &FakeItem) {
        if let Some(action) = item.action() {
            action();
        }
    }

    #[test]
    fn test_attach_mirrors_combination() {
        let _fake = setup();
        let (item, _, _) = item_with_action();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+shift+s")).unwrap();

        attach(&item, &event, None);
        assert_eq!(
            item.key_equivalent(),
            KeyEquivalent {
                key: "s".to_string(),
                modifiers: Modifiers::SUPER | Modifiers::SHIFT,
            }
        );
        assert_eq!(attached(&item), Some(event.clone()));

        event.set_combination(combo("ctrl+f5")).unwrap();
        assert_eq!(item.key_equivalent().key, "\u{F708}");
        event.clear().unwrap();
        assert_eq!(item.key_equivalent(), KeyEquivalent::default());
    }

    #[test]
    fn test_combined_action_gates_handler_on_enabled() {
        let _fake = setup();
        let (item, original_hits, _) = item_with_action();
        let (extra_hits, extra) = counter();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+s")).unwrap();

        attach(&item, &event, Some(extra));
        assert!(handler(&item).is_some());
        perform(&item);
        assert_eq!((original_hits.get(), extra_hits.get()), (1, 1));

        event.disable().unwrap();
        perform(&item);
        assert_eq!((original_hits.get(), extra_hits.get()), (2, 1));
    }

    #[test]
    fn test_hotkey_triggers_item_action() {
        let _fake = setup();
        let (item, original_hits, _) = item_with_action();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+s")).unwrap();
        attach(&item, &event, None);

        center::dispatch(event.identifier(), Transition::KeyDown);
        assert_eq!(original_hits.get(), 1);
    }

    #[test]
    fn test_detach_restores_original() {
        let _fake = setup();
        let (item, _, action) = item_with_action();
        let before = item.key_equivalent();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+s")).unwrap();

        attach(&item, &event, Some(Rc::new(|| {})));
        attach(&item, &event, None);
        assert!(detach(&item));

        assert!(Rc::ptr_eq(&item.action().unwrap(), &action));
        assert_eq!(item.key_equivalent(), before);
        assert_eq!(attached(&item), None);
        assert!(handler(&item).is_none());
        assert_eq!(event.proxy().observation_count(), 0);
        assert!(!detach(&item));
    }

    #[test]
    fn test_detach_restores_missing_action() {
        let _fake = setup();
        let item = Rc::new(FakeItem::default());
        let event = KeyEvent::new("save");

        attach(&item, &event, None);
        assert!(item.action().is_some());
        detach(&item);
        assert!(item.action().is_none());
        assert_eq!(item.key_equivalent(), KeyEquivalent::default());
    }

    #[test]
    fn test_dropped_item_is_swept() {
        let _fake = setup();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+s")).unwrap();
        let (item, _, _) = item_with_action();
        attach(&item, &event, None);
        drop(item);

        // Observers skip the dead item
        event.set_combination(combo("cmd+o")).unwrap();
        center::dispatch(event.identifier(), Transition::KeyDown);

        assert!(sweep() > 0);
        assert_eq!(event.proxy().observation_count(), 0);
    }
}
