use std::any::Any;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

struct Record {
    /// Keeps the owner's allocation (not its value) reserved, so the address
    /// key cannot be reused by another object while this record exists.
    anchor: Weak<dyn Any>,
    values: HashMap<String, Box<dyn Any>>,
}

/// Named values attached to foreign `Rc`-owned objects.
///
/// Records are indexed by owner identity and then by key. The store never
/// keeps an owner alive; records of dropped owners become unreachable and
/// are reclaimed by [`AssociationStore::sweep`].
#[derive(Default)]
pub struct AssociationStore {
    records: HashMap<usize, Record>,
}

fn identity<O: ?Sized>(owner: &Rc<O>) -> usize {
    Rc::as_ptr(owner) as *const () as usize
}

impl AssociationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<O: Any, T: Clone + 'static>(&self, owner: &Rc<O>, key: &str) -> Option<T> {
        self.records
            .get(&identity(owner))?
            .values
            .get(key)?
            .downcast_ref::<T>()
            .cloned()
    }

    /// Attach `value` under `key`, replacing any previous value
    pub fn set<O: Any, T: 'static>(&mut self, owner: &Rc<O>, key: &str, value: T) {
        let anchor: Weak<O> = Rc::downgrade(owner);
        let anchor: Weak<dyn Any> = anchor;
        self.records
            .entry(identity(owner))
            .or_insert_with(|| Record {
                anchor,
                values: HashMap::new(),
            })
            .values
            .insert(key.to_string(), Box::new(value));
    }

    /// Detach and return the value under `key`
    pub fn remove<O: Any, T: 'static>(&mut self, owner: &Rc<O>, key: &str) -> Option<T> {
        let id = identity(owner);
        let record = self.records.get_mut(&id)?;
        let value = record.values.remove(key)?;
        if record.values.is_empty() {
            self.records.remove(&id);
        }
        value.downcast::<T>().ok().map(|value| *value)
    }

    pub fn contains<O: Any>(&self, owner: &Rc<O>, key: &str) -> bool {
        self.records
            .get(&identity(owner))
            .is_some_and(|record| record.values.contains_key(key))
    }

    /// Drop every record whose owner has been deallocated.
    ///
    /// Returns the dropped records' values so callers can dispose of them
    /// outside any borrow of the store.
    pub fn sweep(&mut self) -> Vec<Box<dyn Any>> {
        let dead: Vec<usize> = self
            .records
            .iter()
            .filter(|(_, record)| record.anchor.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        dead.into_iter()
            .filter_map(|id| self.records.remove(&id))
            .flat_map(|record| record.values.into_values())
            .collect()
    }

    /// Number of owners with at least one attached value
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
