use serde::{Deserialize, Deserializer};

/// A field of a partial update.
///
/// Use with `#[serde(default)]`: a missing key stays `Absent`, anything given
/// (including `null` for `Patch<Option<T>>`) becomes `Present`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Present(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Present(v) => Patch::Present(f(v)),
        }
    }

    /// The patched value, or `current` when the field was omitted.
    pub fn unwrap_or(self, current: T) -> T {
        match self {
            Patch::Absent => current,
            Patch::Present(v) => v,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Present)
    }
}
