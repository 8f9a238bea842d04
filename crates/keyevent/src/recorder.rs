use crate::combination::KeyCombination;
use crate::error::Result;
use crate::event::KeyEvent;
use crate::observation::ObservationSet;
use std::rc::{Rc, Weak};

/// The display side of a shortcut recorder control
pub trait RecorderView: 'static {
    /// Show `text`; an empty string means "nothing recorded"
    fn show(&self, text: &str);
}

/// Two-way binding between a recorder control and a [`KeyEvent`].
///
/// Recorded combinations are written through the event, and every change
/// of the event's combination (from any source) refreshes the view. The
/// binding holds the view weakly and stops observing when dropped.
pub struct Recorder {
    event: KeyEvent,
    observations: ObservationSet,
}

impl Recorder {
    pub fn bind<V: RecorderView>(view: &Rc<V>, event: KeyEvent) -> Self {
        view.show(&event.combination().symbols());

        let weak: Weak<V> = Rc::downgrade(view);
        let mut observations = ObservationSet::new();
        observations.add(event.observe_combination_change(move |combination| {
            if let Some(view) = weak.upgrade() {
                view.show(&combination.symbols());
            }
        }));

        Self {
            event,
            observations,
        }
    }

    pub fn event(&self) -> &KeyEvent {
        &self.event
    }

    /// Store a combination the user just typed into the control
    pub fn record(&self, combination: KeyCombination) -> Result<()> {
        self.event.set_combination(combination)
    }

    /// The control's clear button
    pub fn clear(&self) -> Result<()> {
        self.event.clear()
    }

    /// Stop updating the view. Dropping the recorder does the same.
    pub fn unbind(mut self) {
        self.observations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{combo, setup};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Label(RefCell<String>);

    impl RecorderView for Label {
        fn show(&self, text: &str) {
            *self.0.borrow_mut() = text.to_string();
        }
    }

    #[test]
    fn test_binding_is_two_way() {
        let _fake = setup();
        let event = KeyEvent::new("save");
        event.set_combination(combo("cmd+s")).unwrap();
        let label = Rc::new(Label::default());

        let recorder = Recorder::bind(&label, event.clone());
        assert_eq!(*label.0.borrow(), "⌘S");

        recorder.record(combo("cmd+shift+o")).unwrap();
        assert_eq!(*label.0.borrow(), "⇧⌘O");
        assert_eq!(event.combination(), combo("cmd+shift+o"));

        // Changes from elsewhere reach the view too
        KeyEvent::new("save").set_combination(combo("alt+f2")).unwrap();
        assert_eq!(*label.0.borrow(), "⌥F2");

        recorder.clear().unwrap();
        assert_eq!(*label.0.borrow(), "");
        assert!(!event.is_enabled());
    }

    #[test]
    fn test_drop_stops_updates() {
        let _fake = setup();
        let event = KeyEvent::new("save");
        let label = Rc::new(Label::default());

        let recorder = Recorder::bind(&label, event.clone());
        assert_eq!(recorder.event(), &event);
        recorder.unbind();
        event.set_combination(combo("cmd+s")).unwrap();
        assert_eq!(*label.0.borrow(), "");
        assert_eq!(event.proxy().observation_count(), 0);
    }
}
