//! Mod catalog: the ordered, id-unique set of requested workshop items

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Workshop item identifier
///
/// Opaque to this crate: it is passed to steamcmd verbatim and names the
/// staging subdirectory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModId(String);

impl ModId {
    /// Create a new ModId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ModId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ModId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ModId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a display name into the `@name` folder form
///
/// Lowercases and replaces whitespace and path separators with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .to_lowercase()
}

/// A single workshop item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    name: String,
    id: ModId,
}

impl Mod {
    /// Create a mod entry, sanitizing `name`
    pub fn new(name: &str, id: impl Into<ModId>) -> Self {
        Self {
            name: sanitize_name(name),
            id: id.into(),
        }
    }

    /// Sanitized name, used as the install folder suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Workshop identifier
    pub fn id(&self) -> &ModId {
        &self.id
    }
}

impl std::fmt::Display for Mod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Ordered collection of mods with unique ids
///
/// Insertion order is preserved and drives log order, install order and
/// the order of generated parameter lines. Derived subsets are new lists;
/// no operation mutates an existing one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Mod>", into = "Vec<Mod>")]
pub struct ModList {
    mods: Vec<Mod>,
}

impl ModList {
    /// Build a list, rejecting duplicate ids
    pub fn new(mods: Vec<Mod>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(mods.len());
        for m in &mods {
            if !seen.insert(m.id()) {
                return Err(Error::CatalogParse(format!(
                    "duplicate workshop id {} ({})",
                    m.id(),
                    m.name()
                )));
            }
        }
        Ok(Self { mods })
    }

    /// An empty list
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sanitized names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mods.iter().map(Mod::name)
    }

    /// Ids in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &ModId> {
        self.mods.iter().map(Mod::id)
    }

    /// Look up a mod by id
    pub fn find(&self, id: impl AsRef<str>) -> Option<&Mod> {
        let id = id.as_ref();
        self.mods.iter().find(|m| m.id() == id)
    }

    /// Mods of `self` whose id is not present in `other`
    pub fn difference(&self, other: &ModList) -> ModList {
        let excluded: HashSet<&ModId> = other.ids().collect();
        self.filtered(|m| !excluded.contains(m.id()))
    }

    /// Mods of `self` whose id appears in `ids`, in catalog order
    ///
    /// `ids` may contain duplicates or unknown ids; each mod appears at most once.
    pub fn retain_ids<'a>(&self, ids: impl IntoIterator<Item = &'a ModId>) -> ModList {
        let wanted: HashSet<&ModId> = ids.into_iter().collect();
        self.filtered(|m| wanted.contains(m.id()))
    }

    /// Number of mods
    pub fn len(&self) -> usize {
        self.mods.len()
    }

    /// Whether the list holds no mods
    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Iterate in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, Mod> {
        self.mods.iter()
    }

    // Subsets of a unique list are unique, so no re-check is needed.
    fn filtered(&self, keep: impl Fn(&Mod) -> bool) -> ModList {
        ModList {
            mods: self.mods.iter().filter(|m| keep(m)).cloned().collect(),
        }
    }
}

impl TryFrom<Vec<Mod>> for ModList {
    type Error = Error;

    fn try_from(mods: Vec<Mod>) -> Result<Self> {
        Self::new(mods)
    }
}

impl From<ModList> for Vec<Mod> {
    fn from(list: ModList) -> Self {
        list.mods
    }
}

impl<'a> IntoIterator for &'a ModList {
    type Item = &'a Mod;
    type IntoIter = std::slice::Iter<'a, Mod>;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.iter()
    }
}
