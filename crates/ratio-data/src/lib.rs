//! Data-driven catalog loading for the ratio solver.
//!
//! Reads a directory of RON, TOML, or JSON files into a
//! [`ratio_core::catalog::Catalog`], an optional
//! [`ratio_core::solver::SolverConfig`], and an optional
//! [`ratio_core::solver::SolveRequest`]. See [`loader::load_data_dir`].

pub mod loader;
pub mod request;
pub mod schema;

#[cfg(test)]
mod test_fixtures;

pub use loader::{DataFile, DataLoadError, RatioData, RefKind, load_catalog_dir, load_data_dir};
