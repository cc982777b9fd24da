//! Tile Catalog
//!
//! Ordered list of building configs. Lookups scan in order and fall back
//! to the final entry when nothing matches, so a catalog is never empty.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::accounts::tile::{
    Resource, Tile, BUILDING_TYPE_EMPTY, BUILDING_TYPE_SAWMILL, BUILDING_TYPE_STONE_MINE,
    BUILDING_TYPE_TREE,
};

/// Display and behaviour metadata for one building type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    /// Building type code this entry describes.
    pub building_type: u8,
    /// Display name, also the by-name lookup key.
    pub name: String,
    /// Tint as `#rrggbb`.
    #[serde(default)]
    pub color: Option<String>,
    /// Resource granted on collect, for producers.
    #[serde(default)]
    pub produces: Option<Resource>,
}

impl TileConfig {
    fn new(building_type: u8, name: &str, color: &str, produces: Option<Resource>) -> Self {
        Self {
            building_type,
            name: name.to_string(),
            color: Some(color.to_string()),
            produces,
        }
    }
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No entries to fall back to.
    #[error("tile catalog must have at least one entry")]
    Empty,
    /// Malformed catalog JSON.
    #[error("invalid tile catalog: {0}")]
    Json(#[from] serde_json::Error),
    /// Catalog file unreadable.
    #[error("cannot read tile catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-empty, ordered tile catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TileConfig>", into = "Vec<TileConfig>")]
pub struct TileCatalog {
    entries: Vec<TileConfig>,
}

impl TileCatalog {
    /// Build from entries. The last entry is the fallback.
    pub fn new(entries: Vec<TileConfig>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<TileConfig> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Load a JSON catalog file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Entries in lookup order.
    pub fn entries(&self) -> &[TileConfig] {
        &self.entries
    }

    /// Entry used when a lookup misses.
    pub fn fallback(&self) -> &TileConfig {
        // `new` rejects empty catalogs
        &self.entries[self.entries.len() - 1]
    }

    /// First entry with the given type, else the fallback.
    pub fn find_by_type(&self, building_type: u8) -> &TileConfig {
        self.entries
            .iter()
            .find(|config| config.building_type == building_type)
            .unwrap_or_else(|| {
                debug!(building_type, fallback = %self.fallback().name, "No tile config for type");
                self.fallback()
            })
    }

    /// First entry with the given name, else the fallback.
    pub fn find_by_name(&self, name: &str) -> &TileConfig {
        self.entries
            .iter()
            .find(|config| config.name == name)
            .unwrap_or_else(|| {
                debug!(name, fallback = %self.fallback().name, "No tile config for name");
                self.fallback()
            })
    }

    /// Config for a decoded tile.
    pub fn for_tile(&self, tile: &Tile) -> &TileConfig {
        self.find_by_type(tile.building_type)
    }
}

impl Default for TileCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                TileConfig::new(BUILDING_TYPE_TREE, "Tree", "#2f6b2a", None),
                TileConfig::new(BUILDING_TYPE_EMPTY, "Empty", "#8a6d3b", None),
                TileConfig::new(BUILDING_TYPE_SAWMILL, "SawMill", "#b5651d", Some(Resource::Wood)),
                TileConfig::new(
                    BUILDING_TYPE_STONE_MINE,
                    "StoneMine",
                    "#7d7d7d",
                    Some(Resource::Stone),
                ),
            ],
        }
    }
}

impl TryFrom<Vec<TileConfig>> for TileCatalog {
    type Error = CatalogError;

    fn try_from(entries: Vec<TileConfig>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<TileCatalog> for Vec<TileConfig> {
    fn from(catalog: TileCatalog) -> Self {
        catalog.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup_by_type() {
        let catalog = TileCatalog::default();
        assert_eq!(catalog.find_by_type(BUILDING_TYPE_SAWMILL).name, "SawMill");
        assert_eq!(catalog.find_by_type(BUILDING_TYPE_TREE).name, "Tree");
    }

    #[test]
    fn test_unknown_type_falls_back_to_last_entry() {
        let catalog = TileCatalog::default();
        let fallback = catalog.find_by_type(200);
        assert_eq!(fallback, catalog.entries().last().unwrap());
        assert_eq!(fallback.name, "StoneMine");
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = TileCatalog::default();
        assert_eq!(catalog.find_by_name("Empty").building_type, BUILDING_TYPE_EMPTY);
        assert_eq!(catalog.find_by_name("Castle").building_type, BUILDING_TYPE_STONE_MINE);
    }

    #[test]
    fn test_first_match_wins() {
        let catalog = TileCatalog::from_json(
            r##"[
                {"building_type": 2, "name": "Mill A"},
                {"building_type": 2, "name": "Mill B"},
                {"building_type": 0, "name": "Tree", "color": "#00ff00"}
            ]"##,
        )
        .unwrap();
        assert_eq!(catalog.find_by_type(2).name, "Mill A");
        assert_eq!(catalog.find_by_type(7).name, "Tree");
        assert_eq!(catalog.fallback().color.as_deref(), Some("#00ff00"));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(TileCatalog::from_json("[]"), Err(CatalogError::Empty)));
        assert!(matches!(TileCatalog::from_json("{"), Err(CatalogError::Json(_))));
        assert!(serde_json::from_str::<TileCatalog>("[]").is_err());
    }

    #[test]
    fn test_serde_as_plain_list() {
        let json = serde_json::to_string(&TileCatalog::default()).unwrap();
        assert!(json.starts_with('['));
        let back: TileCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TileCatalog::default());
    }
}
