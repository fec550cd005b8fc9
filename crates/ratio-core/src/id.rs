use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in the condensed DAG (an SCC, an item, or a recipe).
    pub struct CondensedId;
}

/// Identifies an item in the catalog. Assigned in registration order, so
/// ordering by id is ordering by catalog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Identifies a recipe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

/// Identifies a facility in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub u32);

/// A node of the bipartite item/recipe graph and of the output plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Item(ItemId),
    Recipe(RecipeId),
}

impl NodeKey {
    pub fn as_item(self) -> Option<ItemId> {
        match self {
            NodeKey::Item(id) => Some(id),
            NodeKey::Recipe(_) => None,
        }
    }

    pub fn as_recipe(self) -> Option<RecipeId> {
        match self {
            NodeKey::Recipe(id) => Some(id),
            NodeKey::Item(_) => None,
        }
    }
}
