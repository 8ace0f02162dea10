//! Collateral asset registry.
//!
//! An [`AssetId`] can only be obtained from a [`CollateralRegistry`], so any id that reaches
//! the engine names an asset the protocol actually supports.

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Index of a supported collateral asset. `0` is the native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(u8);

impl AssetId {
    /// The native asset, always present in every registry.
    pub const NATIVE: AssetId = AssetId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

/// Descriptor of one collateral asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollateralAsset {
    pub id: AssetId,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("at least one collateral asset is required")]
    Empty,
    #[error("too many collateral assets: {0}")]
    TooMany(usize),
    #[error("duplicate collateral symbol: {0}")]
    DuplicateSymbol(String),
    #[error("empty collateral symbol")]
    EmptySymbol,
}

/// Ordered set of supported collateral assets, indexed from 0 (native).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralRegistry {
    assets: Vec<CollateralAsset>,
}

impl CollateralRegistry {
    /// Build a registry from symbols; the first symbol becomes the native asset.
    pub fn new<I, S>(symbols: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        if symbols.is_empty() {
            return Err(RegistryError::Empty);
        }
        if symbols.len() > u8::MAX as usize + 1 {
            return Err(RegistryError::TooMany(symbols.len()));
        }

        let mut seen = HashSet::new();
        let mut assets = Vec::with_capacity(symbols.len());
        for (idx, symbol) in symbols.into_iter().enumerate() {
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Err(RegistryError::EmptySymbol);
            }
            if !seen.insert(symbol.clone()) {
                return Err(RegistryError::DuplicateSymbol(symbol));
            }
            assets.push(CollateralAsset {
                id: AssetId(idx as u8),
                symbol,
            });
        }
        Ok(Self { assets })
    }

    /// Registry holding only the native asset.
    pub fn native_only(symbol: &str) -> Self {
        Self {
            assets: vec![CollateralAsset {
                id: AssetId::NATIVE,
                symbol: symbol.trim().to_uppercase(),
            }],
        }
    }

    /// Validate a raw asset index.
    pub fn resolve(&self, raw: u8) -> Option<AssetId> {
        self.assets.get(raw as usize).map(|a| a.id)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<AssetId> {
        let wanted = symbol.trim().to_uppercase();
        self.assets.iter().find(|a| a.symbol == wanted).map(|a| a.id)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        id.index() < self.assets.len()
    }

    pub fn get(&self, id: AssetId) -> Option<&CollateralAsset> {
        self.assets.get(id.index())
    }

    pub fn ids(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets.iter().map(|a| a.id)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
