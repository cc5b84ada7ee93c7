//! Instrument registry: a fixed id -> symbol table.
//!
//! Loaded once at startup from configuration and shared behind an `Arc`.
//! Instrument ids are small positive integers (1..=N); the registry never
//! changes for the lifetime of the process.

use std::collections::BTreeMap;

use crate::error::{FundingDataError, Result};

/// Immutable instrument lookup table.
#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    instruments: BTreeMap<i32, String>,
}

impl InstrumentRegistry {
    /// Build a registry from (id, symbol) pairs.
    ///
    /// Rejects non-positive or duplicate ids.
    pub fn new(pairs: impl IntoIterator<Item = (i32, String)>) -> Result<Self> {
        let mut instruments = BTreeMap::new();
        for (id, symbol) in pairs {
            if id < 1 {
                return Err(FundingDataError::Validation(format!(
                    "instrument id must be positive, got {}",
                    id
                )));
            }
            if instruments.insert(id, symbol).is_some() {
                return Err(FundingDataError::Validation(format!(
                    "duplicate instrument id {}",
                    id
                )));
            }
        }
        if instruments.is_empty() {
            return Err(FundingDataError::Validation(
                "instrument registry is empty".to_string(),
            ));
        }
        Ok(Self { instruments })
    }

    /// Build from the configured instrument list.
    pub fn from_config(entries: &[config::InstrumentEntry]) -> Result<Self> {
        Self::new(entries.iter().map(|e| (e.id, e.symbol.clone())))
    }

    /// Look up the symbol for an instrument id.
    pub fn symbol(&self, id: i32) -> Option<&str> {
        self.instruments.get(&id).map(String::as_str)
    }

    /// Whether the id is a registered instrument.
    pub fn contains(&self, id: i32) -> bool {
        self.instruments.contains_key(&id)
    }

    /// All registered ids, ascending.
    pub fn ids(&self) -> Vec<i32> {
        self.instruments.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
