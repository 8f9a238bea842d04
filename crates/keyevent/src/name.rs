use std::fmt;

/// Prefix used when an event name does not carry its own
pub const DEFAULT_PREFIX: &str = "keyevent_";

/// A namespace prepended to a [`Name`] when deriving its persistence key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prefix(String);

impl Prefix {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Prefix {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The stable identity of a key event.
///
/// Two names are equal when both the raw string and the prefix match; equal
/// names always resolve to the same proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    raw: String,
    prefix: Prefix,
}

impl Name {
    /// A name under the default prefix
    pub fn new(raw: impl Into<String>) -> Self {
        Self::with_prefix(raw, Prefix::default())
    }

    pub fn with_prefix(raw: impl Into<String>, prefix: impl Into<Prefix>) -> Self {
        Self {
            raw: raw.into(),
            prefix: prefix.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Key under which the event's combination is persisted: prefix then name
    pub fn storage_key(&self) -> String {
        format!("{}{}", self.prefix, self.raw)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Name {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Name {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&Name> for Name {
    fn from(name: &Name) -> Self {
        name.clone()
    }
}
