//! Window class -> icon mapping.
//!
//! `IconMap` is an immutable snapshot. `IconResolver` owns the current
//! snapshot and swaps it wholesale on reload, so a reconciliation pass that
//! holds a snapshot always sees one complete mapping.

use std::collections::HashMap;
use std::sync::Arc;

use crate::store::{IconStore, StoreError};

/// Anything that can list (class, icon) pairs
pub trait IconSource {
    fn all_icons(&self) -> Result<Vec<(String, String)>, StoreError>;
}

impl IconSource for IconStore {
    fn all_icons(&self) -> Result<Vec<(String, String)>, StoreError> {
        IconStore::all_icons(self)
    }
}

/// Lowercase window class -> icon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconMap {
    icons: HashMap<String, String>,
}

impl IconMap {
    /// Build a map; later pairs win on duplicate (case-folded) classes
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let icons = pairs
            .into_iter()
            .map(|(class, icon)| (class.as_ref().to_lowercase(), icon.into()))
            .collect();
        Self { icons }
    }

    pub fn get(&self, class: &str) -> Option<&str> {
        self.icons.get(&class.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Entries sorted by class
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .icons
            .iter()
            .map(|(class, icon)| (class.as_str(), icon.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}

/// Owner of the current icon snapshot
#[derive(Debug)]
pub struct IconResolver {
    current: Arc<IconMap>,
}

impl IconResolver {
    /// Initial load. There is nothing to fall back to, so failure is returned as-is.
    pub fn load(source: &impl IconSource) -> Result<Self, StoreError> {
        let map = IconMap::from_pairs(source.all_icons()?);
        log::info!("Loaded {} window icons", map.len());
        Ok(Self {
            current: Arc::new(map),
        })
    }

    /// Replace the mapping with the store's current contents.
    /// On failure the previous mapping stays in effect.
    pub fn reload(&mut self, source: &impl IconSource) -> Result<usize, StoreError> {
        let map = IconMap::from_pairs(source.all_icons()?);
        let count = map.len();
        self.current = Arc::new(map);
        Ok(count)
    }

    /// The mapping to use for the next pass
    pub fn snapshot(&self) -> Arc<IconMap> {
        Arc::clone(&self.current)
    }
}
