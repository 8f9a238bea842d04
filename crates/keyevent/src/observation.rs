use crate::backend::Transition;
use crate::center;
use crate::proxy::Identifier;
use std::collections::HashSet;
use tracing::trace;

/// What an observation listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    /// Key-down or key-up signals of the installed hook
    Key(Transition),
    /// Changes of the proxy's combination
    Combination,
    /// Changes of whether the proxy has an active hook
    RegistrationState,
}

/// Coarse grouping of [`ObservationKind`]s used for bulk removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationCategory {
    KeyEvent,
    ProxyState,
}

impl ObservationKind {
    pub fn category(&self) -> ObservationCategory {
        match self {
            ObservationKind::Key(_) => ObservationCategory::KeyEvent,
            ObservationKind::Combination | ObservationKind::RegistrationState => {
                ObservationCategory::ProxyState
            }
        }
    }
}

/// Handle to one handler registered on a proxy.
///
/// Handles are plain values: dropping one does not cancel the handler. Use
/// [`Observation::cancel`] or keep them in an [`ObservationSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    identifier: Identifier,
    token: u64,
    kind: ObservationKind,
}

impl Observation {
    pub(crate) fn new(identifier: Identifier, token: u64, kind: ObservationKind) -> Self {
        Self {
            identifier,
            token,
            kind,
        }
    }

    /// The proxy this observation is registered on
    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn kind(&self) -> ObservationKind {
        self.kind
    }

    pub fn category(&self) -> ObservationCategory {
        self.kind.category()
    }

    /// Remove the handler from its proxy. Returns false if it was already gone.
    pub fn cancel(&self) -> bool {
        center::find(self.identifier).is_some_and(|proxy| proxy.remove_observation(self))
    }
}

/// The observations held by one owner (a menu item, a recorder, an app
/// controller). Every observation still in the set is cancelled when the set
/// is dropped.
#[derive(Debug, Default)]
pub struct ObservationSet {
    observations: HashSet<Observation>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an observation. Returns false if it was already tracked.
    pub fn add(&mut self, observation: Observation) -> bool {
        self.observations.insert(observation)
    }

    /// Stop tracking and cancel one observation
    pub fn remove(&mut self, observation: &Observation) -> bool {
        if self.observations.remove(observation) {
            observation.cancel();
            true
        } else {
            false
        }
    }

    /// Cancel every tracked observation in `category`, leaving the rest.
    ///
    /// Returns how many were removed.
    pub fn remove_all(&mut self, category: ObservationCategory) -> usize {
        let matching: Vec<Observation> = self
            .observations
            .iter()
            .filter(|observation| observation.category() == category)
            .copied()
            .collect();
        for observation in &matching {
            self.remove(observation);
        }
        trace!("Removed {} {:?} observations", matching.len(), category);
        matching.len()
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        for observation in self.observations.drain() {
            observation.cancel();
        }
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        self.observations.contains(observation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl Extend<Observation> for ObservationSet {
    fn extend<T: IntoIterator<Item = Observation>>(&mut self, iter: T) {
        for observation in iter {
            self.add(observation);
        }
    }
}

impl Drop for ObservationSet {
    fn drop(&mut self) {
        self.clear();
    }
}
