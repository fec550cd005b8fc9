//! File discovery, format detection, and the directory loading pipeline.
//!
//! A data directory holds `items`, `facilities`, and `recipes` files (each in
//! exactly one of RON, TOML, or JSON), plus optional `solver` and `request`
//! files. Names are resolved in dependency order: items and facilities first,
//! then recipes that refer to them, then the request that refers to all three.

use ratio_core::catalog::{Catalog, CatalogBuilder, CatalogError, RecipeEntry};
use ratio_core::id::*;
use ratio_core::solver::{SolveRequest, SolverConfig};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::request::{load_request, load_solver_config};
use crate::schema::*;

// ===========================================================================
// Files and references
// ===========================================================================

/// The files a data directory can hold, by base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFile {
    Items,
    Facilities,
    Recipes,
    Solver,
    Request,
}

impl DataFile {
    pub const fn base_name(self) -> &'static str {
        match self {
            DataFile::Items => "items",
            DataFile::Facilities => "facilities",
            DataFile::Recipes => "recipes",
            DataFile::Solver => "solver",
            DataFile::Request => "request",
        }
    }

    /// Key of the `[[...]]` array a TOML catalog file stores its entries
    /// under. Solver and request files are single documents.
    pub const fn toml_list_key(self) -> Option<&'static str> {
        match self {
            DataFile::Items | DataFile::Facilities | DataFile::Recipes => Some(self.base_name()),
            DataFile::Solver | DataFile::Request => None,
        }
    }
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// What a name in a data file refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Item,
    Facility,
    Recipe,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefKind::Item => "item",
            RefKind::Facility => "facility",
            RefKind::Recipe => "recipe",
        })
    }
}

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("no {file}.ron, {file}.toml or {file}.json in {dir}")]
    MissingRequired { file: DataFile, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// One data file present in more than one format.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// `owner` names the entry holding the reference, e.g. `recipe 'smelt'`.
    #[error("unknown {expected_kind} '{name}' in {owner} ({file})")]
    UnresolvedRef {
        file: PathBuf,
        owner: String,
        name: String,
        expected_kind: RefKind,
    },

    #[error("{kind} '{name}' declared twice in {file}")]
    DuplicateName {
        file: PathBuf,
        kind: RefKind,
        name: String,
    },

    /// The resolved catalog was rejected on finalization.
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub const fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|format| Some(format.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Locate `file` in `dir` in whichever format it was written.
///
/// Returns `Ok(None)` when it is absent and `ConflictingFormats` when it
/// exists in two formats at once.
pub fn find_data_file(dir: &Path, file: DataFile) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|format| dir.join(format!("{}.{}", file.base_name(), format.extension())))
        .filter(|path| path.exists());

    match (present.next(), present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (found, _) => Ok(found),
    }
}

/// Locate a catalog file that must be present.
pub fn require_data_file(dir: &Path, file: DataFile) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, file)?.ok_or_else(|| DataLoadError::MissingRequired {
        file,
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a single-document file (`solver.*`, `request.*`).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Read the entries of a catalog file. RON and JSON files hold a top-level
/// list; TOML files hold an array of tables keyed by the file's base name.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    file: DataFile,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let key = match (format, file.toml_list_key()) {
        (Format::Toml, Some(key)) => key,
        _ => return deserialize_file(path),
    };

    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let entries = table
        .remove(key)
        .ok_or_else(|| parse_error(path, format!("no [[{key}]] entries")))?;
    entries
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution
// ===========================================================================

/// Names declared by one catalog file, mapped to the ids they were
/// registered under.
struct NameIndex<'p, Id> {
    kind: RefKind,
    declared_in: &'p Path,
    ids: HashMap<String, Id>,
}

impl<'p, Id: Copy> NameIndex<'p, Id> {
    fn new(kind: RefKind, declared_in: &'p Path) -> Self {
        Self {
            kind,
            declared_in,
            ids: HashMap::new(),
        }
    }

    /// Register `name` through `register`, rejecting a second declaration
    /// before anything reaches the builder.
    fn declare(&mut self, name: &str, register: impl FnOnce() -> Id) -> Result<Id, DataLoadError> {
        match self.ids.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DataLoadError::DuplicateName {
                file: self.declared_in.to_path_buf(),
                kind: self.kind,
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => Ok(*slot.insert(register())),
        }
    }

    /// Resolve a reference made by `owner` in the file at `referenced_in`.
    fn resolve(&self, name: &str, owner: &str, referenced_in: &Path) -> Result<Id, DataLoadError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| DataLoadError::UnresolvedRef {
                file: referenced_in.to_path_buf(),
                owner: owner.to_string(),
                name: name.to_string(),
                expected_kind: self.kind,
            })
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct RatioData {
    pub catalog: Catalog,
    /// `solver.*` if present, otherwise the defaults.
    pub config: SolverConfig,
    /// `request.*` if present.
    pub request: Option<SolveRequest>,
}

/// Load a full data directory: catalog, solver configuration, and request.
pub fn load_data_dir(dir: &Path) -> Result<RatioData, DataLoadError> {
    let catalog = load_catalog_dir(dir)?;

    let config = match find_data_file(dir, DataFile::Solver)? {
        Some(path) => load_solver_config(&path)?,
        None => SolverConfig::default(),
    };

    let request = find_data_file(dir, DataFile::Request)?
        .map(|path| load_request(&path, &catalog))
        .transpose()?;

    Ok(RatioData {
        catalog,
        config,
        request,
    })
}

/// Load and resolve the catalog files of a data directory.
pub fn load_catalog_dir(dir: &Path) -> Result<Catalog, DataLoadError> {
    let items_path = require_data_file(dir, DataFile::Items)?;
    let facilities_path = require_data_file(dir, DataFile::Facilities)?;
    let recipes_path = require_data_file(dir, DataFile::Recipes)?;

    let items: Vec<ItemData> = deserialize_list(&items_path, DataFile::Items)?;
    let facilities: Vec<FacilityData> = deserialize_list(&facilities_path, DataFile::Facilities)?;
    let recipes: Vec<RecipeData> = deserialize_list(&recipes_path, DataFile::Recipes)?;

    let mut builder = CatalogBuilder::new();

    // Phase 1: items and facilities.
    let mut item_names = NameIndex::new(RefKind::Item, &items_path);
    for data in &items {
        item_names.declare(&data.name, || builder.register_item(&data.name, data.tier))?;
    }

    let mut facility_names = NameIndex::new(RefKind::Facility, &facilities_path);
    for data in &facilities {
        facility_names.declare(&data.name, || {
            builder.register_facility(&data.name, data.power, data.tier)
        })?;
    }

    // Phase 2: recipes, resolving their references.
    let mut recipe_names: NameIndex<'_, RecipeId> = NameIndex::new(RefKind::Recipe, &recipes_path);
    for data in &recipes {
        let owner = format!("recipe '{}'", data.name);
        let inputs = resolve_entries(&item_names, &data.inputs, &owner, &recipes_path)?;
        let outputs = resolve_entries(&item_names, &data.outputs, &owner, &recipes_path)?;
        let facility = facility_names.resolve(&data.facility, &owner, &recipes_path)?;
        recipe_names.declare(&data.name, || {
            builder.register_recipe(&data.name, inputs, outputs, facility, data.crafting_time)
        })?;
        debug!(recipe = %data.name, "resolved recipe");
    }

    // Phase 3: per-item flags, then finalize.
    for data in &items {
        if data.forced_raw {
            builder.force_raw(&data.name)?;
        }
        if let Some(label) = &data.label {
            builder.mutate_item(&data.name, |def| def.name = Some(label.clone()))?;
        }
    }
    for data in &facilities {
        if let Some(label) = &data.label {
            builder.mutate_facility(&data.name, |def| def.name = Some(label.clone()))?;
        }
    }

    let catalog = builder.build()?;
    info!(
        dir = %dir.display(),
        items = catalog.item_count(),
        facilities = catalog.facility_count(),
        recipes = catalog.recipe_count(),
        "loaded catalog"
    );
    Ok(catalog)
}

fn resolve_entries(
    item_names: &NameIndex<'_, ItemId>,
    entries: &[RecipeEntryData],
    owner: &str,
    file: &Path,
) -> Result<Vec<RecipeEntry>, DataLoadError> {
    entries
        .iter()
        .map(|entry| {
            let id = item_names.resolve(entry.item(), owner, file)?;
            Ok(RecipeEntry::new(id, entry.amount()))
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
