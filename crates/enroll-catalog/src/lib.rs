//! Enroll Catalog - Offline campus system
//!
//! This crate provides a campus system that lives entirely in memory,
//! described by a TOML catalog:
//! - `catalog` - catalog file format, parsing and validation
//! - `campus` - `StaticCampus` / `StaticSession` implementing the campus traits

pub mod campus;
pub mod catalog;

pub use campus::{StaticCampus, StaticSession};
pub use catalog::{Catalog, CatalogAccount, CatalogClass, CatalogError, CatalogSector};
