//! # Alphabet
//!
//! Bidirectional registry between strings and dense integer ids. Training
//! code grows an alphabet with [`Alphabet::lookup_or_insert`]; inference and
//! evaluation only ever call [`Alphabet::lookup`], which never mutates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Dense string/id bijection. Ids start at 0 and follow first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Alphabet {
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl Alphabet {
    /// Create an empty alphabet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `item`, registering it first if it is unseen.
    pub fn lookup_or_insert(&mut self, item: &str) -> usize {
        if let Some(&id) = self.index.get(item) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push(item.to_string());
        self.index.insert(item.to_string(), id);
        id
    }

    /// Return the id of `item` without registering it.
    pub fn lookup(&self, item: &str) -> Option<usize> {
        self.index.get(item).copied()
    }

    /// Return the string registered under `id`.
    ///
    /// # Panics
    /// Panics if `id` was never handed out by this alphabet.
    pub fn resolve(&self, id: usize) -> &str {
        match self.entries.get(id) {
            Some(item) => item,
            None => panic!(
                "alphabet id {id} is out of range (size {})",
                self.entries.len()
            ),
        }
    }

    /// Non-panicking variant of [`Alphabet::resolve`].
    pub fn get(&self, id: usize) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.index.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered strings, ordered by id.
    pub fn labels(&self) -> &[String] {
        &self.entries
    }

    /// Encode `items`, silently dropping the ones this alphabet does not know.
    pub fn encode_known<'s, I>(&self, items: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'s String>,
    {
        items
            .into_iter()
            .filter_map(|item| self.lookup(item))
            .collect()
    }
}

impl From<Vec<String>> for Alphabet {
    fn from(entries: Vec<String>) -> Self {
        entries.iter().collect()
    }
}

impl From<Alphabet> for Vec<String> {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.entries
    }
}

impl<S: AsRef<str>> FromIterator<S> for Alphabet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut alphabet = Alphabet::new();
        for item in iter {
            alphabet.lookup_or_insert(item.as_ref());
        }
        alphabet
    }
}
