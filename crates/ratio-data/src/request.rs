//! Solver configuration and plan request files.
//!
//! `solver.*` deserializes straight into [`SolverConfig`]; missing fields keep
//! their defaults. `request.*` names items and recipes, which are resolved
//! against the loaded catalog into a [`SolveRequest`].

use ratio_core::catalog::Catalog;
use ratio_core::solver::{SolveRequest, SolverConfig, Target};
use std::path::Path;
use tracing::debug;

use crate::loader::{DataLoadError, RefKind, deserialize_file};
use crate::schema::RequestData;

/// Load a solver configuration file.
pub fn load_solver_config(path: &Path) -> Result<SolverConfig, DataLoadError> {
    let config: SolverConfig = deserialize_file(path)?;
    debug!(
        max_iterations = config.max_iterations,
        pivot_tolerance = config.pivot_tolerance,
        "loaded solver config"
    );
    Ok(config)
}

/// Load a request file and resolve its names against `catalog`.
pub fn load_request(path: &Path, catalog: &Catalog) -> Result<SolveRequest, DataLoadError> {
    let data: RequestData = deserialize_file(path)?;
    resolve_request(&data, catalog, path)
}

/// Resolve a parsed request. `file` is only used for error reporting.
pub fn resolve_request(
    data: &RequestData,
    catalog: &Catalog,
    file: &Path,
) -> Result<SolveRequest, DataLoadError> {
    let unresolved = |name: &str, expected_kind: RefKind, owner: &str| {
        DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            owner: owner.to_string(),
            name: name.to_string(),
            expected_kind,
        }
    };
    let item_named = |name: &str, owner: &str| {
        catalog
            .item_id(name)
            .ok_or_else(|| unresolved(name, RefKind::Item, owner))
    };

    let targets = data
        .targets
        .iter()
        .map(|(name, rate)| Ok(Target::new(item_named(name, "targets")?, *rate)))
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let mut request = SolveRequest::new(targets);

    for (item_name, recipe_name) in &data.overrides {
        let owner = format!("override for '{item_name}'");
        let item = item_named(item_name, &owner)?;
        let recipe = catalog
            .recipe_id(recipe_name)
            .ok_or_else(|| unresolved(recipe_name, RefKind::Recipe, &owner))?;
        request = request.with_override(item, recipe);
    }

    for name in &data.manual_raw {
        request = request.with_manual_raw(item_named(name, "manual_raw")?);
    }

    debug!(
        targets = request.targets.len(),
        overrides = request.overrides.len(),
        "resolved request"
    );
    Ok(request)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{cleanup, make_test_dir};
    use ratio_core::test_utils::*;
    use std::fs;

    #[test]
    fn solver_config_partial_file_keeps_defaults() {
        let dir = make_test_dir("solver_partial");
        let path = dir.join("solver.ron");
        fs::write(&path, "(max_iterations: 7)").unwrap();

        let config = load_solver_config(&path).unwrap();
        assert_eq!(config.max_iterations, 7);
        assert_eq!(
            config.pivot_tolerance,
            SolverConfig::default().pivot_tolerance
        );

        cleanup(&dir);
    }

    #[test]
    fn solver_config_toml() {
        let dir = make_test_dir("solver_toml");
        let path = dir.join("solver.toml");
        fs::write(&path, "max_iterations = 12\npivot_tolerance = 1e-8\n").unwrap();

        let config = load_solver_config(&path).unwrap();
        assert_eq!(config.max_iterations, 12);
        assert_eq!(config.pivot_tolerance, 1e-8);

        cleanup(&dir);
    }

    #[test]
    fn request_resolves_names() {
        let catalog = multi_recipe_catalog();
        let data = RequestData {
            targets: vec![("iron_nugget".into(), 60.0), ("quartz_glass".into(), 15.0)],
            overrides: [("iron_nugget".to_string(), "furnace_iron_nugget_2".to_string())]
                .into_iter()
                .collect(),
            manual_raw: vec!["quartz_sand".into()],
        };

        let request = resolve_request(&data, &catalog, Path::new("request.ron")).unwrap();
        assert_eq!(
            request.targets,
            vec![
                Target::new(item(&catalog, "iron_nugget"), 60.0),
                Target::new(item(&catalog, "quartz_glass"), 15.0),
            ]
        );
        assert_eq!(
            request.overrides.get(&item(&catalog, "iron_nugget")),
            Some(&recipe(&catalog, "furnace_iron_nugget_2"))
        );
        assert!(request.manual_raw.contains(&item(&catalog, "quartz_sand")));
    }

    #[test]
    fn request_unknown_recipe_is_unresolved() {
        let catalog = multi_recipe_catalog();
        let data = RequestData {
            targets: vec![("iron_nugget".into(), 60.0)],
            overrides: [("iron_nugget".to_string(), "nugget_from_air".to_string())]
                .into_iter()
                .collect(),
            manual_raw: Vec::new(),
        };

        let result = resolve_request(&data, &catalog, Path::new("request.ron"));
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: RefKind::Recipe, ref owner, .. })
                if name == "nugget_from_air" && owner == "override for 'iron_nugget'"
        ));
    }

    #[test]
    fn request_unknown_manual_raw_item() {
        let catalog = iron_chain_catalog();
        let data = RequestData {
            targets: vec![("iron_component".into(), 60.0)],
            manual_raw: vec!["iron_dust".into()],
            ..RequestData::default()
        };

        let err = resolve_request(&data, &catalog, Path::new("request.toml")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown item 'iron_dust' in manual_raw (request.toml)"
        );
    }

    #[test]
    fn request_file_json() {
        let catalog = iron_chain_catalog();
        let dir = make_test_dir("request_json");
        let path = dir.join("request.json");
        fs::write(
            &path,
            r#"{"targets": [["iron_component", 60.0]], "manual_raw": ["iron_nugget"]}"#,
        )
        .unwrap();

        let request = load_request(&path, &catalog).unwrap();
        assert_eq!(request.targets.len(), 1);
        assert!(request.overrides.is_empty());
        assert!(request.manual_raw.contains(&item(&catalog, "iron_nugget")));

        cleanup(&dir);
    }
}
