use std::collections::BTreeMap;

use super::raw_sample::RawSample;

/// Named gesture windows. Keys are unique; ordering is by name so that any
/// snapshot iterates deterministically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GestureSet {
    entries: BTreeMap<String, Vec<RawSample>>,
}

impl GestureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `samples` under `name`, replacing any previous entry wholesale.
    pub fn insert(&mut self, name: impl Into<String>, samples: Vec<RawSample>) -> Option<Vec<RawSample>> {
        self.entries.insert(name.into(), samples)
    }

    pub fn get(&self, name: &str) -> Option<&[RawSample]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<RawSample>> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RawSample])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<RawSample>)> for GestureSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<RawSample>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
