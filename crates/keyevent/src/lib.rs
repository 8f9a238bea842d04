//! Named global key events.
//!
//! A [`KeyEvent`] is a global hotkey identified by a stable [`Name`]. Its
//! combination is persisted under the name, restored on the next launch,
//! and can drive a recorder control and a menu item's action and key
//! equivalent through the same event.
//!
//! Every event resolves to one [`EventProxy`] in the thread's registry,
//! which owns the OS hook. All of this is main-thread state: create events,
//! attach UI and call [`center::pump`] from the UI run loop.
//!
//! ```no_run
//! use keyevent::{center, KeyEvent, Transition};
//!
//! let save = KeyEvent::new("save");
//! save.set_combination("cmd+shift+s".parse().unwrap()).unwrap();
//! save.observe(Transition::KeyDown, || println!("save!"));
//!
//! // From the run loop:
//! center::pump();
//! ```

pub use global_hotkey::hotkey::{Code, Modifiers};

pub mod association;
pub mod backend;
pub mod center;
mod combination;
mod error;
mod event;
pub mod menu;
mod name;
mod observation;
mod proxy;
pub mod recorder;
mod storage;
pub mod store;
#[cfg(test)]
mod testing;

pub use backend::{GlobalHotkeyBackend, HookHandle, HotkeyBackend, Signal, Transition};
pub use center::CenterConfig;
pub use combination::KeyCombination;
pub use error::{Error, Result};
pub use event::KeyEvent;
pub use name::{Name, Prefix, DEFAULT_PREFIX};
pub use observation::{Observation, ObservationCategory, ObservationKind, ObservationSet};
pub use proxy::{EventProxy, Identifier, RegistrationState};
pub use storage::ProxyStorage;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
