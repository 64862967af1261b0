//! Parsing and validation of TOML campus catalogs.
//!
//! A catalog describes accounts, sectors and classes with seat counts:
//!
//! ```toml
//! [[accounts]]
//! username = "student"
//! password = "secret"
//!
//! [[sectors]]
//! name = "Elective Pool A"
//!
//! [[sectors.classes]]
//! name = "CS101"
//! section = "A"
//! capacity = 30
//! registered = 30
//! credit = 3.0
//! opens_after = 2
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid catalog {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl CatalogError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Root of a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub accounts: Vec<CatalogAccount>,

    pub sectors: Vec<CatalogSector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSector {
    pub name: String,

    #[serde(default)]
    pub classes: Vec<CatalogClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogClass {
    pub name: String,

    #[serde(default)]
    pub section: String,

    pub capacity: u32,

    /// Seats already taken by other students.
    #[serde(default)]
    pub registered: u32,

    #[serde(default)]
    pub credit: f32,

    /// Failed attempts after which a seat frees up in a full class.
    #[serde(default)]
    pub opens_after: Option<u32>,

    /// Rejects every register attempt with this reason.
    #[serde(default)]
    pub reject: Option<String>,
}

impl Catalog {
    /// Loads and validates a catalog file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks the catalog is usable as a campus.
    ///
    /// Class names must be unique across the whole catalog because campus
    /// operations address classes by name only.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.sectors.is_empty() {
            return Err(CatalogError::invalid("sectors", "at least one sector is required"));
        }

        let mut sector_names = HashSet::new();
        let mut class_names = HashSet::new();

        for sector in &self.sectors {
            if sector.name.trim().is_empty() {
                return Err(CatalogError::invalid("sectors.name", "must not be empty"));
            }
            if !sector_names.insert(sector.name.as_str()) {
                return Err(CatalogError::invalid(
                    "sectors.name",
                    format!("duplicate sector {:?}", sector.name),
                ));
            }

            for class in &sector.classes {
                if class.name.trim().is_empty() {
                    return Err(CatalogError::invalid(
                        "sectors.classes.name",
                        format!("empty class name in sector {:?}", sector.name),
                    ));
                }
                if !class_names.insert(class.name.as_str()) {
                    return Err(CatalogError::invalid(
                        "sectors.classes.name",
                        format!("duplicate class {:?}", class.name),
                    ));
                }
                if class.capacity == 0 {
                    return Err(CatalogError::invalid(
                        "sectors.classes.capacity",
                        format!("class {:?} must have at least one seat", class.name),
                    ));
                }
                if class.registered > class.capacity {
                    return Err(CatalogError::invalid(
                        "sectors.classes.registered",
                        format!(
                            "class {:?} has {} registered but capacity {}",
                            class.name, class.registered, class.capacity
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}
