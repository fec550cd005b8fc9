//! Temporary data directories for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Create a temporary directory with a unique name for test isolation.
pub fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ratio_data_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

/// `iron_ore -> iron_nugget -> iron_component` as RON files.
pub fn write_iron_chain(dir: &Path) {
    fs::write(
        dir.join("items.ron"),
        r#"[
    (name: "iron_ore"),
    (name: "iron_nugget", tier: 1, label: Some("Iron Nugget")),
    (name: "iron_component", tier: 2),
]"#,
    )
    .unwrap();
    fs::write(
        dir.join("facilities.ron"),
        r#"[
    (name: "furnace", power: 10.0, tier: 1),
    (name: "component_mc", power: 12.0, tier: 2),
]"#,
    )
    .unwrap();
    fs::write(
        dir.join("recipes.ron"),
        r#"[
    (
        name: "furnace_iron_nugget",
        inputs: [("iron_ore", 1)],
        outputs: [("iron_nugget", 1)],
        facility: "furnace",
        crafting_time: 2.0,
    ),
    (
        name: "component_iron_cmpt",
        inputs: [(item: "iron_nugget", amount: 1)],
        outputs: [("iron_component", 1)],
        facility: "component_mc",
        crafting_time: 2.0,
    ),
]"#,
    )
    .unwrap();
}
