mod config;
mod error;
mod service;

pub use config::parse_species_config;
pub use error::RegistryError;
pub use service::{json_error, Service};

use std::{collections::hash_map::Entry, path::Path, sync::Arc};

use ahash::AHashMap;
use located_error::prelude::*;
use log::{info, warn};
use parking_lot::RwLock;

use index_store::IndexStore;

/// Owner of every loaded species index, keyed by lowercased species name.
///
/// Stores are immutable once loaded, so readers only take the lock for the
/// duration of a single lookup and scan lock-free on their own `Arc`.
/// Writes (load/remove) are startup or admin operations.
#[derive(Default)]
pub struct Registry {
    stores: RwLock<AHashMap<String, Arc<IndexStore>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every index named by a species config file.
    pub fn from_config(path: &Path) -> Result<Self> {
        let registry = Self::new();
        let entries = parse_species_config(path)?;
        for (species, index) in &entries {
            registry.load(species, index)?;
        }
        info!("Loaded {} indexes", entries.len());
        Ok(registry)
    }

    /// Load a binary index under a species name. Names are case-insensitive
    /// and must be unique.
    pub fn load(&self, species: &str, index: &Path) -> Result<()> {
        use RegistryError::DuplicateSpecies;
        let species = species.to_lowercase();
        let loc_msg = || format!("While loading the {species} index");

        info!("Loading {species} index");
        if self.stores.read().contains_key(&species) {
            return Err(DuplicateSpecies(species.clone())).with_loc(loc_msg);
        }

        let store = IndexStore::load(index).with_loc(loc_msg)?;

        // Only a warning: the GRCh38 index declares species "human" while
        // hosts historically register it under other aliases.
        let declared = store.species().to_lowercase();
        if declared != species {
            warn!("'{declared}' does not match user specified species {species}");
        }

        match self.stores.write().entry(species.clone()) {
            Entry::Occupied(_) => Err(DuplicateSpecies(species.clone())).with_loc(loc_msg),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(store));
                info!("{species} index loaded");
                Ok(())
            }
        }
    }

    /// Look up a loaded store. The returned `Arc` keeps the store alive for
    /// the duration of a scan even if the species is removed meanwhile.
    pub fn get(&self, species: &str) -> Result<Arc<IndexStore>> {
        use RegistryError::UnknownSpecies;
        self.stores
            .read()
            .get(&species.to_lowercase())
            .cloned()
            .ok_or_else(|| UnknownSpecies(species.to_string()))
            .loc("While looking up a species index")
    }

    /// Drop a loaded store. The backing array is freed once the last
    /// in-flight scan releases its handle.
    pub fn remove(&self, species: &str) -> Result<()> {
        use RegistryError::UnknownSpecies;
        self.stores
            .write()
            .remove(&species.to_lowercase())
            .map(|_| ())
            .ok_or_else(|| UnknownSpecies(species.to_string()))
            .loc("While removing a species index")
    }

    #[must_use]
    pub fn contains(&self, species: &str) -> bool {
        self.stores.read().contains_key(&species.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
