//! Immutable item, recipe, and facility catalog.
//!
//! Built with [`CatalogBuilder`] in three phases (registration, mutation,
//! finalization). Ids are dense indices handed out in registration order, so
//! iterating ids in ascending order walks the catalog in its original order.

use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item definition in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub key: String,
    /// Production depth used for display ordering.
    pub tier: u32,
    pub name: Option<String>,
    /// Always treated as a raw material, regardless of available recipes.
    pub forced_raw: bool,
}

/// A recipe input/output entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub item: ItemId,
    pub amount: u32,
}

impl RecipeEntry {
    pub fn new(item: ItemId, amount: u32) -> Self {
        Self { item, amount }
    }
}

/// A recipe definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDef {
    pub key: String,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<RecipeEntry>,
    pub facility: FacilityId,
    /// Seconds per craft.
    pub crafting_time: f64,
}

impl RecipeDef {
    /// Units per minute produced or consumed by one facility for an entry
    /// of the given amount.
    pub fn per_minute(&self, amount: u32) -> f64 {
        amount as f64 * 60.0 / self.crafting_time
    }

    /// Amount of the first output entry for `item`.
    pub fn output_amount(&self, item: ItemId) -> Option<u32> {
        self.outputs.iter().find(|e| e.item == item).map(|e| e.amount)
    }

    /// Amount of the first input entry for `item`.
    pub fn input_amount(&self, item: ItemId) -> Option<u32> {
        self.inputs.iter().find(|e| e.item == item).map(|e| e.amount)
    }

    pub fn is_single_output(&self) -> bool {
        self.outputs.len() == 1
    }

    pub fn consumes(&self, item: ItemId) -> bool {
        self.inputs.iter().any(|e| e.item == item)
    }
}

/// A facility (machine) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityDef {
    pub key: String,
    /// Power draw of one running instance.
    pub power: f64,
    pub tier: u32,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    items: Vec<ItemDef>,
    item_key_to_id: HashMap<String, ItemId>,
    recipes: Vec<RecipeDef>,
    recipe_key_to_id: HashMap<String, RecipeId>,
    facilities: Vec<FacilityDef>,
    facility_key_to_id: HashMap<String, FacilityId>,
    duplicates: Vec<(&'static str, String)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item. Returns its ID.
    pub fn register_item(&mut self, key: &str, tier: u32) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(ItemDef {
            key: key.to_string(),
            tier,
            name: None,
            forced_raw: false,
        });
        if self.item_key_to_id.insert(key.to_string(), id).is_some() {
            self.duplicates.push(("item", key.to_string()));
        }
        id
    }

    /// Phase 1: Register a facility. Returns its ID.
    pub fn register_facility(&mut self, key: &str, power: f64, tier: u32) -> FacilityId {
        let id = FacilityId(self.facilities.len() as u32);
        self.facilities.push(FacilityDef {
            key: key.to_string(),
            power,
            tier,
            name: None,
        });
        if self.facility_key_to_id.insert(key.to_string(), id).is_some() {
            self.duplicates.push(("facility", key.to_string()));
        }
        id
    }

    /// Phase 1: Register a recipe. Returns its ID.
    pub fn register_recipe(
        &mut self,
        key: &str,
        inputs: Vec<RecipeEntry>,
        outputs: Vec<RecipeEntry>,
        facility: FacilityId,
        crafting_time: f64,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            key: key.to_string(),
            inputs,
            outputs,
            facility,
            crafting_time,
        });
        if self.recipe_key_to_id.insert(key.to_string(), id).is_some() {
            self.duplicates.push(("recipe", key.to_string()));
        }
        id
    }

    /// Phase 2: Mutate an existing item by key.
    pub fn mutate_item<F>(&mut self, key: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut ItemDef),
    {
        let id = self
            .item_key_to_id
            .get(key)
            .ok_or(CatalogError::NotFound(key.to_string()))?;
        f(&mut self.items[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by key.
    pub fn mutate_recipe<F>(&mut self, key: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut RecipeDef),
    {
        let id = self
            .recipe_key_to_id
            .get(key)
            .ok_or(CatalogError::NotFound(key.to_string()))?;
        f(&mut self.recipes[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing facility by key.
    pub fn mutate_facility<F>(&mut self, key: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut FacilityDef),
    {
        let id = self
            .facility_key_to_id
            .get(key)
            .ok_or(CatalogError::NotFound(key.to_string()))?;
        f(&mut self.facilities[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mark an item as always raw.
    pub fn force_raw(&mut self, key: &str) -> Result<(), CatalogError> {
        self.mutate_item(key, |item| item.forced_raw = true)
    }

    pub fn item_id(&self, key: &str) -> Option<ItemId> {
        self.item_key_to_id.get(key).copied()
    }

    pub fn recipe_id(&self, key: &str) -> Option<RecipeId> {
        self.recipe_key_to_id.get(key).copied()
    }

    pub fn facility_id(&self, key: &str) -> Option<FacilityId> {
        self.facility_key_to_id.get(key).copied()
    }

    /// Phase 3: Finalize and build the immutable catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some((kind, key)) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateKey { kind, key });
        }

        for recipe in &self.recipes {
            for entry in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(CatalogError::InvalidItemRef(entry.item));
                }
            }
            if recipe.facility.0 as usize >= self.facilities.len() {
                return Err(CatalogError::InvalidFacilityRef(recipe.facility));
            }
            if recipe.crafting_time.is_nan() || recipe.crafting_time <= 0.0 {
                return Err(CatalogError::InvalidCraftingTime {
                    recipe: recipe.key.clone(),
                });
            }
        }

        // Producers per item, in catalog order.
        let mut producers: Vec<Vec<RecipeId>> = vec![Vec::new(); self.items.len()];
        for (index, recipe) in self.recipes.iter().enumerate() {
            let id = RecipeId(index as u32);
            for entry in &recipe.outputs {
                let list = &mut producers[entry.item.0 as usize];
                if list.last() != Some(&id) {
                    list.push(id);
                }
            }
        }

        Ok(Catalog {
            items: self.items,
            item_key_to_id: self.item_key_to_id,
            recipes: self.recipes,
            recipe_key_to_id: self.recipe_key_to_id,
            facilities: self.facilities,
            facility_key_to_id: self.facility_key_to_id,
            producers,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build(). Safe to share across solves.
#[derive(Debug)]
pub struct Catalog {
    items: Vec<ItemDef>,
    item_key_to_id: HashMap<String, ItemId>,
    recipes: Vec<RecipeDef>,
    recipe_key_to_id: HashMap<String, RecipeId>,
    facilities: Vec<FacilityDef>,
    facility_key_to_id: HashMap<String, FacilityId>,
    producers: Vec<Vec<RecipeId>>,
}

impl Catalog {
    pub fn get_item(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_facility(&self, id: FacilityId) -> Option<&FacilityDef> {
        self.facilities.get(id.0 as usize)
    }

    pub fn item_id(&self, key: &str) -> Option<ItemId> {
        self.item_key_to_id.get(key).copied()
    }

    pub fn recipe_id(&self, key: &str) -> Option<RecipeId> {
        self.recipe_key_to_id.get(key).copied()
    }

    pub fn facility_id(&self, key: &str) -> Option<FacilityId> {
        self.facility_key_to_id.get(key).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }

    /// Recipes listing `item` among their outputs, in catalog order.
    /// Empty for unknown items.
    pub fn producers_of(&self, item: ItemId) -> &[RecipeId] {
        self.producers
            .get(item.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &ItemDef)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, def)| (ItemId(i as u32), def))
    }

    pub fn recipes(&self) -> impl Iterator<Item = (RecipeId, &RecipeDef)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(i, def)| (RecipeId(i as u32), def))
    }

    pub fn facilities(&self) -> impl Iterator<Item = (FacilityId, &FacilityDef)> {
        self.facilities
            .iter()
            .enumerate()
            .map(|(i, def)| (FacilityId(i as u32), def))
    }

    /// Item key for display, falling back to the raw index.
    pub fn item_key(&self, id: ItemId) -> String {
        self.get_item(id)
            .map(|def| def.key.clone())
            .unwrap_or_else(|| format!("#{}", id.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemId),
    #[error("invalid facility reference: {0:?}")]
    InvalidFacilityRef(FacilityId),
    #[error("recipe '{recipe}' must have a positive crafting time")]
    InvalidCraftingTime { recipe: String },
    #[error("duplicate {kind} key '{key}'")]
    DuplicateKey { kind: &'static str, key: String },
}
