//! Alloy factory loaded from JSON data files. The first recipe choice for
//! alloy closes a loop that cannot be balanced, so the solver has to back
//! off to the ore recipe.

use std::fs;
use std::path::{Path, PathBuf};

use ratio_core::flow::CycleFailure;
use ratio_core::solver::{SolveError, Solver};
use ratio_core::test_utils::{assert_close, facility, item, recipe};
use ratio_core::validation::validate_determinism;
use ratio_data::{DataLoadError, RefKind, load_data_dir};
use ratio_stats::{build_production_table, collect_stats};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ratio_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_alloy_factory(dir: &Path) {
    fs::write(
        dir.join("items.json"),
        r#"[
            {"name": "ore"},
            {"name": "scrap", "tier": 1},
            {"name": "alloy", "tier": 2}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("facilities.json"),
        r#"[
            {"name": "smelter", "power": 20.0, "tier": 1},
            {"name": "shredder", "power": 5.0, "tier": 1}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("recipes.json"),
        r#"[
            {
                "name": "alloy_from_scrap",
                "inputs": [["scrap", 1]],
                "outputs": [["alloy", 1]],
                "facility": "smelter",
                "crafting_time": 2.0
            },
            {
                "name": "alloy_from_ore",
                "inputs": [{"item": "ore", "amount": 1}],
                "outputs": [{"item": "alloy", "amount": 1}],
                "facility": "smelter",
                "crafting_time": 2.0
            },
            {
                "name": "scrap_from_alloy",
                "inputs": [["alloy", 1]],
                "outputs": [["scrap", 1]],
                "facility": "shredder",
                "crafting_time": 2.0
            }
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("request.json"),
        r#"{"targets": [["alloy", 60.0]]}"#,
    )
    .unwrap();
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn backtracking_from_data_files() {
    let dir = make_test_dir("alloy_json");
    write_alloy_factory(&dir);

    let data = load_data_dir(&dir).unwrap();
    let c = &data.catalog;
    let request = data.request.expect("request.json present");
    let plan = Solver::with_config(c, data.config).solve(&request).unwrap();

    let alloy = item(c, "alloy");
    assert_eq!(plan.iterations, 2);
    assert!(plan.is_complete());
    assert_eq!(plan.producer_of(alloy), Some(recipe(c, "alloy_from_ore")));
    assert!(plan.item(item(c, "scrap")).is_none());

    let stats = collect_stats(&plan, c, &request.manual_raw);
    assert_close(stats.total_power, 40.0);
    assert_close(stats.facilities_required(facility(c, "smelter")), 2.0);

    let rows = build_production_table(&plan, c, &request.overrides, &request.manual_raw);
    let row = rows.iter().find(|r| r.item == alloy).unwrap();
    assert_eq!(
        row.available_recipes,
        vec![recipe(c, "alloy_from_scrap"), recipe(c, "alloy_from_ore")]
    );
    assert_eq!(row.selected_recipe, Some(recipe(c, "alloy_from_ore")));

    let determinism = validate_determinism(c, &request, data.config).unwrap();
    assert!(determinism.is_deterministic);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn override_in_request_file_yields_best_effort() {
    let dir = make_test_dir("alloy_override");
    write_alloy_factory(&dir);
    fs::write(
        dir.join("request.json"),
        r#"{"targets": [["alloy", 60.0]], "overrides": {"alloy": "alloy_from_scrap"}}"#,
    )
    .unwrap();

    let data = load_data_dir(&dir).unwrap();
    let request = data.request.expect("request.json present");
    let plan = Solver::with_config(&data.catalog, data.config)
        .solve(&request)
        .unwrap();

    assert!(!plan.is_complete());
    assert_eq!(plan.invalid_cycles[0].reason, CycleFailure::NoSolution);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn iteration_cap_from_solver_file() {
    let dir = make_test_dir("alloy_cap");
    write_alloy_factory(&dir);
    fs::write(dir.join("solver.json"), r#"{"max_iterations": 1}"#).unwrap();

    let data = load_data_dir(&dir).unwrap();
    let request = data.request.expect("request.json present");
    let err = Solver::with_config(&data.catalog, data.config)
        .solve(&request)
        .unwrap_err();
    assert!(matches!(err, SolveError::MaxIterations(1)));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unknown_target_in_request_file() {
    let dir = make_test_dir("alloy_unknown_target");
    write_alloy_factory(&dir);
    fs::write(dir.join("request.json"), r#"{"targets": [["steel", 10.0]]}"#).unwrap();

    let err = load_data_dir(&dir).unwrap_err();
    assert!(matches!(
        err,
        DataLoadError::UnresolvedRef { ref name, expected_kind: RefKind::Item, ref owner, .. }
            if name == "steel" && owner == "targets"
    ));
    assert!(err.to_string().contains("request.json"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn conflicting_request_formats() {
    let dir = make_test_dir("alloy_conflict");
    write_alloy_factory(&dir);
    fs::write(dir.join("request.ron"), "(targets: [])").unwrap();

    let err = load_data_dir(&dir).unwrap_err();
    assert!(matches!(err, DataLoadError::ConflictingFormats { .. }));

    let _ = fs::remove_dir_all(&dir);
}
