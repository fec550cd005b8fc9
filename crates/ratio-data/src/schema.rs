//! Serde data structures for catalog and request files.
//!
//! These types mirror the on-disk format. All cross-references are by name
//! and are resolved to ids by the loader.

use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Catalog
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default)]
    pub tier: u32,
    /// Display name.
    #[serde(default)]
    pub label: Option<String>,
    /// Never produced, even when a recipe for it exists.
    #[serde(default)]
    pub forced_raw: bool,
}

/// A facility definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityData {
    pub name: String,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub label: Option<String>,
}

/// A recipe input or output entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeEntryData {
    /// Short form: `("item_name", amount)`.
    Short(String, u32),
    Full { item: String, amount: u32 },
}

impl RecipeEntryData {
    pub fn item(&self) -> &str {
        match self {
            Self::Short(item, _) | Self::Full { item, .. } => item,
        }
    }

    pub fn amount(&self) -> u32 {
        match self {
            Self::Short(_, amount) | Self::Full { amount, .. } => *amount,
        }
    }
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<RecipeEntryData>,
    pub outputs: Vec<RecipeEntryData>,
    pub facility: String,
    /// Seconds per craft.
    pub crafting_time: f64,
}

// ===========================================================================
// Request
// ===========================================================================

/// A plan request in a data file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestData {
    /// `(item_name, units_per_minute)` pairs.
    pub targets: Vec<(String, f64)>,
    /// Item name to recipe name.
    pub overrides: BTreeMap<String, String>,
    pub manual_raw: Vec<String>,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_entries_accept_both_forms_in_ron() {
        let recipe: RecipeData = ron::from_str(
            r#"(
                name: "fill_bottle",
                inputs: [("bottle", 1), (item: "water", amount: 1)],
                outputs: [("filled_bottle", 2)],
                facility: "filling_machine",
                crafting_time: 2.0,
            )"#,
        )
        .unwrap();

        assert_eq!(recipe.inputs.len(), 2);
        assert_eq!(recipe.inputs[0].item(), "bottle");
        assert_eq!(recipe.inputs[1].item(), "water");
        assert_eq!(recipe.inputs[1].amount(), 1);
        assert_eq!(recipe.outputs[0].amount(), 2);
    }

    #[test]
    fn recipe_entries_accept_both_forms_in_json() {
        let recipe: RecipeData = serde_json::from_str(
            r#"{
                "name": "tools_battery",
                "inputs": [["glass_component", 5], {"item": "iron_component", "amount": 10}],
                "outputs": [{"item": "battery", "amount": 1}],
                "facility": "tools_asm",
                "crafting_time": 10.0
            }"#,
        )
        .unwrap();

        assert_eq!(recipe.inputs[0].amount(), 5);
        assert_eq!(recipe.inputs[1].item(), "iron_component");
        assert_eq!(recipe.inputs[1].amount(), 10);
        assert_eq!(recipe.outputs[0].item(), "battery");
    }

    #[test]
    fn source_recipe_has_no_inputs() {
        let recipe: RecipeData = toml::from_str(
            r#"
name = "mine_ore"
outputs = [["iron_ore", 1]]
facility = "miner"
crafting_time = 1.0
"#,
        )
        .unwrap();
        assert!(recipe.inputs.is_empty());
        assert_eq!(recipe.outputs[0].item(), "iron_ore");
    }

    #[test]
    fn item_defaults() {
        let item: ItemData = serde_json::from_str(r#"{"name": "iron_ore"}"#).unwrap();
        assert_eq!(item.tier, 0);
        assert!(item.label.is_none());
        assert!(!item.forced_raw);
    }

    #[test]
    fn request_defaults_to_empty() {
        let request: RequestData = serde_json::from_str("{}").unwrap();
        assert!(request.targets.is_empty());
        assert!(request.overrides.is_empty());
        assert!(request.manual_raw.is_empty());
    }
}
