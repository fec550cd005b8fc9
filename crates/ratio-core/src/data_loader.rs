//! Catalog loading from a single JSON document.
//!
//! Feature-gated behind `data-loader`. Field names are accepted in both
//! snake_case and the camelCase used by exported game data
//! (`itemId`, `facilityId`, `craftingTime`, `powerConsumption`).

use crate::catalog::{CatalogBuilder, CatalogError, RecipeEntry};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("unknown facility reference: {0}")]
    UnknownFacilityRef(String),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub facilities: Vec<FacilityData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
    /// Item keys that are always raw.
    #[serde(default, alias = "forcedRaw")]
    pub forced_raw: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ItemData {
    #[serde(alias = "id")]
    pub key: String,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct FacilityData {
    #[serde(alias = "id")]
    pub key: String,
    #[serde(default, alias = "powerConsumption")]
    pub power: f64,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    #[serde(alias = "id")]
    pub key: String,
    #[serde(default)]
    pub inputs: Vec<RecipeEntryData>,
    #[serde(default)]
    pub outputs: Vec<RecipeEntryData>,
    #[serde(alias = "facilityId")]
    pub facility: String,
    #[serde(alias = "craftingTime")]
    pub crafting_time: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct RecipeEntryData {
    #[serde(alias = "itemId")]
    pub item: String,
    pub amount: u32,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

pub fn load_catalog_json(json: &str) -> Result<CatalogBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_str(json)?;
    build_catalog(data)
}

pub fn load_catalog_json_bytes(bytes: &[u8]) -> Result<CatalogBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_slice(bytes)?;
    build_catalog(data)
}

fn resolve_entries(
    builder: &CatalogBuilder,
    entries: &[RecipeEntryData],
) -> Result<Vec<RecipeEntry>, DataLoadError> {
    entries
        .iter()
        .map(|e| {
            builder
                .item_id(&e.item)
                .map(|id| RecipeEntry::new(id, e.amount))
                .ok_or_else(|| DataLoadError::UnknownItemRef(e.item.clone()))
        })
        .collect()
}

fn build_catalog(data: CatalogData) -> Result<CatalogBuilder, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    for item in &data.items {
        builder.register_item(&item.key, item.tier);
        if let Some(name) = &item.name {
            builder.mutate_item(&item.key, |def| def.name = Some(name.clone()))?;
        }
    }

    for facility in &data.facilities {
        builder.register_facility(&facility.key, facility.power, facility.tier);
        if let Some(name) = &facility.name {
            builder.mutate_facility(&facility.key, |def| def.name = Some(name.clone()))?;
        }
    }

    for recipe in &data.recipes {
        let inputs = resolve_entries(&builder, &recipe.inputs)?;
        let outputs = resolve_entries(&builder, &recipe.outputs)?;
        let facility = builder
            .facility_id(&recipe.facility)
            .ok_or_else(|| DataLoadError::UnknownFacilityRef(recipe.facility.clone()))?;
        builder.register_recipe(&recipe.key, inputs, outputs, facility, recipe.crafting_time);
    }

    for key in &data.forced_raw {
        if builder.item_id(key).is_none() {
            return Err(DataLoadError::UnknownItemRef(key.clone()));
        }
        builder.force_raw(key)?;
    }

    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================
