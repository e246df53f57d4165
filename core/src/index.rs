use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::path::Path;

use crate::error::Result;
use crate::persist::{load_index, save_index, IndexPaths};

/// Weight of a domain: number of distinct sources listing it.
pub type Weight = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Free,
    Disposable,
    Unknown,
}

impl Category {
    /// Categories that are persisted into an index.
    pub const INDEXED: [Category; 2] = [Category::Free, Category::Disposable];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Free => "free",
            Category::Disposable => "disposable",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category weights for a single domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weights {
    pub free: Weight,
    pub disposable: Weight,
}

impl Weights {
    pub fn new(free: Weight, disposable: Weight) -> Self {
        Self { free, disposable }
    }

    pub fn total(&self) -> Weight {
        self.free + self.disposable
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for Weights {
    type Output = Weights;
    fn add(self, rhs: Weights) -> Weights {
        Weights { free: self.free + rhs.free, disposable: self.disposable + rhs.disposable }
    }
}

impl AddAssign for Weights {
    fn add_assign(&mut self, rhs: Weights) {
        *self = *self + rhs;
    }
}

/// Weighted domain store for a single category.
#[derive(Debug, Clone)]
pub struct DomainIndex {
    category: Category,
    entries: HashMap<String, Weight>,
}

impl DomainIndex {
    pub fn new(category: Category) -> Self {
        Self { category, entries: HashMap::new() }
    }

    pub fn from_entries<I, S>(category: Category, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Weight)>,
        S: Into<String>,
    {
        let mut index = Self::new(category);
        for (domain, weight) in entries {
            index.put(domain, weight);
        }
        index
    }

    pub fn category(&self) -> Category { self.category }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Insert or overwrite the weight for `domain`.
    pub fn put(&mut self, domain: impl Into<String>, weight: Weight) {
        self.entries.insert(domain.into(), weight);
    }

    /// Stored weight, or 0 when `domain` is absent.
    pub fn get(&self, domain: &str) -> Weight {
        self.entries.get(domain).copied().unwrap_or(0)
    }

    /// Entries whose domain satisfies `predicate`, heaviest first, ties by domain.
    pub fn entries_where<F>(&self, predicate: F) -> Vec<(&str, Weight)>
    where
        F: Fn(&str) -> bool,
    {
        let mut found: Vec<(&str, Weight)> = self
            .entries
            .iter()
            .filter(|(domain, _)| predicate(domain))
            .map(|(domain, weight)| (domain.as_str(), *weight))
            .collect();
        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        found
    }

    /// `suffix` itself plus every entry below it on a label boundary.
    pub fn entries_with_suffix(&self, suffix: &str) -> Vec<(&str, Weight)> {
        let dotted = format!(".{suffix}");
        self.entries_where(|domain| domain == suffix || domain.ends_with(&dotted))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        save_index(&IndexPaths::new(dir), self)
    }

    pub fn load(category: Category, dir: &Path) -> Result<Self> {
        load_index(&IndexPaths::new(dir), category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_and_get_defaults_to_zero() {
        let mut index = DomainIndex::new(Category::Free);
        index.put("gmail.com", 3);
        index.put("gmail.com", 7);
        assert_eq!(index.get("gmail.com"), 7);
        assert_eq!(index.get("nope.example"), 0);
        assert_eq!(index.get(""), 0);
    }

    #[test]
    fn suffix_enumeration_is_ordered_and_label_aware() {
        let index = DomainIndex::from_entries(
            Category::Disposable,
            [("a.mail.io", 2), ("b.mail.io", 5), ("mail.io", 2), ("gmail.io", 9)],
        );
        let found = index.entries_with_suffix("mail.io");
        assert_eq!(found, vec![("b.mail.io", 5), ("a.mail.io", 2), ("mail.io", 2)]);
        assert_eq!(found, index.entries_with_suffix("mail.io"));
    }
}
