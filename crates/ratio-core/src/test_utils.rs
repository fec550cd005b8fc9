//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{Catalog, CatalogBuilder, RecipeEntry};
use crate::id::*;

// ===========================================================================
// Lookups
// ===========================================================================

pub fn item(catalog: &Catalog, key: &str) -> ItemId {
    catalog
        .item_id(key)
        .unwrap_or_else(|| panic!("fixture item '{key}' missing"))
}

pub fn recipe(catalog: &Catalog, key: &str) -> RecipeId {
    catalog
        .recipe_id(key)
        .unwrap_or_else(|| panic!("fixture recipe '{key}' missing"))
}

pub fn facility(catalog: &Catalog, key: &str) -> FacilityId {
    catalog
        .facility_id(key)
        .unwrap_or_else(|| panic!("fixture facility '{key}' missing"))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got: {actual}"
    );
}

fn one(item: ItemId) -> Vec<RecipeEntry> {
    vec![RecipeEntry::new(item, 1)]
}

// ===========================================================================
// Catalogs
// ===========================================================================

fn iron_chain_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    let ore = b.register_item("iron_ore", 0);
    let nugget = b.register_item("iron_nugget", 1);
    let powder = b.register_item("iron_powder", 2);
    let component = b.register_item("iron_component", 2);

    let furnace = b.register_facility("furnace", 10.0, 1);
    let grinder = b.register_facility("grinder", 8.0, 1);
    let component_mc = b.register_facility("component_mc", 12.0, 2);

    b.register_recipe("furnace_iron_nugget", one(ore), one(nugget), furnace, 2.0);
    b.register_recipe("grinder_iron_powder", one(nugget), one(powder), grinder, 2.0);
    b.register_recipe(
        "component_iron_cmpt",
        one(nugget),
        one(component),
        component_mc,
        2.0,
    );
    b
}

/// `iron_ore -> iron_nugget -> iron_component`, plus an unused powder
/// branch. Every recipe runs at 30/min per facility.
pub fn iron_chain_catalog() -> Catalog {
    iron_chain_builder().build().expect("iron chain catalog")
}

/// Iron chain where the ore has a mining recipe but is flagged raw.
pub fn forced_raw_catalog() -> Catalog {
    let mut b = iron_chain_builder();
    let ore = b.item_id("iron_ore").expect("ore");
    let miner = b.register_facility("miner", 5.0, 1);
    b.register_recipe("mine_iron_ore", Vec::new(), one(ore), miner, 1.0);
    b.force_raw("iron_ore").expect("force raw");
    b.build().expect("forced raw catalog")
}

/// Battery from glass and iron components, two independent branches.
pub fn complex_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let ore = b.register_item("iron_ore", 0);
    let sand = b.register_item("quartz_sand", 0);
    let nugget = b.register_item("iron_nugget", 1);
    let glass = b.register_item("quartz_glass", 1);
    let iron_cmpt = b.register_item("iron_component", 2);
    let glass_cmpt = b.register_item("glass_component", 2);
    let battery = b.register_item("battery", 3);

    let furnace = b.register_facility("furnace", 10.0, 1);
    let component_mc = b.register_facility("component_mc", 12.0, 2);
    let tools_asm = b.register_facility("tools_asm", 15.0, 3);

    b.register_recipe(
        "tools_battery",
        vec![
            RecipeEntry::new(glass_cmpt, 5),
            RecipeEntry::new(iron_cmpt, 10),
        ],
        one(battery),
        tools_asm,
        10.0,
    );
    b.register_recipe(
        "component_glass_cmpt",
        one(glass),
        one(glass_cmpt),
        component_mc,
        2.0,
    );
    b.register_recipe(
        "component_iron_cmpt",
        one(nugget),
        one(iron_cmpt),
        component_mc,
        2.0,
    );
    b.register_recipe("furnace_quartz_glass", one(sand), one(glass), furnace, 2.0);
    b.register_recipe("furnace_iron_nugget", one(ore), one(nugget), furnace, 2.0);
    b.build().expect("complex catalog")
}

/// Two recipes each for `iron_nugget` and `quartz_glass`.
pub fn multi_recipe_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let ore = b.register_item("iron_ore", 0);
    let powder = b.register_item("iron_powder", 0);
    let nugget = b.register_item("iron_nugget", 1);
    let sand = b.register_item("quartz_sand", 0);
    let glass = b.register_item("quartz_glass", 1);

    let furnace = b.register_facility("furnace", 10.0, 1);
    let smelter = b.register_facility("smelter", 20.0, 2);

    b.register_recipe("furnace_iron_nugget", one(ore), one(nugget), furnace, 2.0);
    b.register_recipe("furnace_iron_nugget_2", one(powder), one(nugget), smelter, 1.0);
    b.register_recipe("glass_1", one(sand), one(glass), furnace, 2.0);
    b.register_recipe(
        "glass_2",
        vec![RecipeEntry::new(sand, 2)],
        vec![RecipeEntry::new(glass, 3)],
        smelter,
        3.0,
    );
    b.build().expect("multi recipe catalog")
}

fn bottle_cycle_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    let water = b.register_item("water", 0);
    let bottle = b.register_item("bottle", 1);
    let filled = b.register_item("filled_bottle", 2);
    let liquid = b.register_item("grass_liquid", 2);

    let filler = b.register_facility("filling_machine", 10.0, 1);
    let dismantler = b.register_facility("dismantler", 10.0, 1);

    b.register_recipe(
        "fill_bottle",
        vec![RecipeEntry::new(bottle, 1), RecipeEntry::new(water, 1)],
        vec![RecipeEntry::new(filled, 2)],
        filler,
        2.0,
    );
    b.register_recipe(
        "dismantle_bottle",
        one(filled),
        vec![RecipeEntry::new(bottle, 1), RecipeEntry::new(liquid, 1)],
        dismantler,
        2.0,
    );
    b
}

/// `fill_bottle` and `dismantle_bottle` recreate each other's inputs.
pub fn bottle_cycle_catalog() -> Catalog {
    bottle_cycle_builder().build().expect("bottle cycle catalog")
}

/// Bottle cycle plus `drink_bottle`, an outside consumer of `filled_bottle`
/// at 30/min per facility.
pub fn bottle_drink_catalog() -> Catalog {
    let mut b = bottle_cycle_builder();
    let filled = b.item_id("filled_bottle").expect("filled_bottle");
    let drink = b.register_item("drink", 3);
    let bar = b.register_facility("bar", 4.0, 3);
    b.register_recipe("drink_bottle", one(filled), one(drink), bar, 2.0);
    b.build().expect("bottle drink catalog")
}

/// `plate -> rod -> frame -> plate + 2 rod`, every recipe at one craft per
/// minute. `strip_frame` returns more rod than the loop needs, so balancing
/// 60 plate/min asks for -30 `roll_rod` facilities. Both `roll_rod` and
/// `weld_frame` burn one `flux` each.
pub fn rod_surplus_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let flux = b.register_item("flux", 0);
    let plate = b.register_item("plate", 1);
    let rod = b.register_item("rod", 1);
    let frame = b.register_item("frame", 2);

    let mill = b.register_facility("mill", 6.0, 1);

    b.register_recipe(
        "roll_rod",
        vec![RecipeEntry::new(plate, 1), RecipeEntry::new(flux, 1)],
        one(rod),
        mill,
        60.0,
    );
    b.register_recipe(
        "weld_frame",
        vec![RecipeEntry::new(rod, 1), RecipeEntry::new(flux, 1)],
        one(frame),
        mill,
        60.0,
    );
    b.register_recipe(
        "strip_frame",
        one(frame),
        vec![RecipeEntry::new(plate, 1), RecipeEntry::new(rod, 2)],
        mill,
        60.0,
    );
    b.build().expect("rod surplus catalog")
}

/// `alloy_from_scrap` closes a singular loop through `scrap_from_alloy`;
/// `alloy_from_ore` is the way out.
pub fn backtrack_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let ore = b.register_item("ore", 0);
    let scrap = b.register_item("scrap", 1);
    let alloy = b.register_item("alloy", 2);

    let smelter = b.register_facility("smelter", 20.0, 1);
    let shredder = b.register_facility("shredder", 5.0, 1);

    b.register_recipe("alloy_from_scrap", one(scrap), one(alloy), smelter, 2.0);
    b.register_recipe("alloy_from_ore", one(ore), one(alloy), smelter, 2.0);
    b.register_recipe("scrap_from_alloy", one(alloy), one(scrap), shredder, 2.0);
    b.build().expect("backtrack catalog")
}

/// `count` interchangeable `bottle -> bottle` recipes. Every choice is a
/// singular self-loop.
pub fn self_loop_catalog(count: usize) -> Catalog {
    let mut b = CatalogBuilder::new();
    let bottle = b.register_item("bottle", 1);
    let machine = b.register_facility("refiller", 1.0, 1);
    for k in 0..count {
        b.register_recipe(&format!("refill_{k}"), one(bottle), one(bottle), machine, 2.0);
    }
    b.build().expect("self loop catalog")
}

/// `part_0 -> part_1 -> ... -> part_n`, one recipe per link.
pub fn deep_chain_catalog(n: usize) -> Catalog {
    let mut b = CatalogBuilder::new();
    let parts: Vec<ItemId> = (0..=n)
        .map(|k| b.register_item(&format!("part_{k}"), k as u32))
        .collect();
    let press = b.register_facility("press", 1.0, 1);
    for k in 1..=n {
        b.register_recipe(
            &format!("make_part_{k}"),
            one(parts[k - 1]),
            one(parts[k]),
            press,
            1.0,
        );
    }
    b.build().expect("deep chain catalog")
}

/// `layers` tiers of `width` items. Each item above tier 0 is made from two
/// neighbours in the tier below; tier 0 is raw.
pub fn layered_catalog(layers: usize, width: usize) -> Catalog {
    let mut b = CatalogBuilder::new();
    let ids: Vec<Vec<ItemId>> = (0..layers)
        .map(|layer| {
            (0..width)
                .map(|j| b.register_item(&format!("item_{layer}_{j}"), layer as u32))
                .collect()
        })
        .collect();
    let assembler = b.register_facility("assembler", 4.0, 1);
    for layer in 1..layers {
        for j in 0..width {
            let left = ids[layer - 1][j];
            let right = ids[layer - 1][(j + 1) % width];
            let inputs = if left == right {
                vec![RecipeEntry::new(left, 2)]
            } else {
                vec![RecipeEntry::new(left, 1), RecipeEntry::new(right, 1)]
            };
            b.register_recipe(
                &format!("make_{layer}_{j}"),
                inputs,
                one(ids[layer][j]),
                assembler,
                1.0 + (j % 3) as f64,
            );
        }
    }
    b.build().expect("layered catalog")
}
