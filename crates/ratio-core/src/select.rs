//! Recipe selection heuristic.

use crate::catalog::{Catalog, RecipeDef};
use crate::id::{ItemId, RecipeId};
use std::collections::BTreeSet;

/// Pick a recipe for an item from `candidates` (already filtered for
/// exclusions, in catalog order). `path` holds the items on the current
/// traversal path from a target down to the item being resolved.
///
/// Preference order:
/// 1. single-output recipes whose inputs avoid the path,
/// 2. the first single-output recipe,
/// 3. any recipe whose inputs avoid the path,
/// 4. the first candidate.
///
/// Path avoidance only applies when the path is non-empty. Returns `None`
/// only for an empty candidate list.
pub fn select_recipe(
    catalog: &Catalog,
    candidates: &[RecipeId],
    path: &BTreeSet<ItemId>,
) -> Option<RecipeId> {
    let defs: Vec<(RecipeId, &RecipeDef)> = candidates
        .iter()
        .filter_map(|&id| catalog.get_recipe(id).map(|def| (id, def)))
        .collect();
    let avoids_path = |def: &RecipeDef| !def.inputs.iter().any(|e| path.contains(&e.item));

    let single_output: Vec<&(RecipeId, &RecipeDef)> =
        defs.iter().filter(|(_, def)| def.is_single_output()).collect();

    if let Some(&&(first, _)) = single_output.first() {
        if !path.is_empty() {
            if let Some(&&(id, _)) = single_output.iter().find(|(_, def)| avoids_path(def)) {
                return Some(id);
            }
        }
        return Some(first);
    }

    if !path.is_empty() {
        if let Some(&(id, _)) = defs.iter().find(|(_, def)| avoids_path(def)) {
            return Some(id);
        }
    }

    candidates.first().copied()
}
