//! Label and description tables.
//!
//! The catalog maps a class index (the position in the model's output
//! vector) to a canonical label, and a label to a free-text description.
//! It is read from a JSON document of the form
//!
//! ```json
//! { "labels": ["Apple___Apple_scab", ...], "descriptions": { "Apple___Apple_scab": "..." } }
//! ```
//!
//! and validated once when loaded. A copy of the PlantVillage tables is
//! compiled into the crate.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Returned for labels that have no entry in the description table
pub const FALLBACK_DESCRIPTION: &str = "No additional information available.";

const PLANT_VILLAGE: &str = include_str!("../catalog/plant_village.json");

#[derive(Deserialize)]
struct CatalogDocument {
    labels: Vec<String>,

    #[serde(default)]
    descriptions: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    /// Class index -> label
    labels: Vec<String>,

    /// Label -> description
    descriptions: HashMap<String, String>,
}

impl Catalog {
    /// The built-in 38 class PlantVillage tables
    pub fn plant_village() -> Result<Self> {
        Catalog::from_json(PLANT_VILLAGE)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading catalog from {}", path.display());

        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Catalog(format!("{}: {}", path.display(), e)))?;

        Catalog::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: CatalogDocument =
            serde_json::from_str(raw).map_err(|e| Error::Catalog(e.to_string()))?;

        Catalog::new(doc.labels, doc.descriptions)
    }

    /// Build a catalog, rejecting empty or duplicate labels and empty descriptions
    pub fn new(labels: Vec<String>, descriptions: HashMap<String, String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::Catalog("label table is empty".into()));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::Catalog(format!("label {} is empty", index)));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::Catalog(format!(
                    "label '{}' appears more than once (again at index {})",
                    label, index
                )));
            }
        }

        for (label, description) in descriptions.iter() {
            if description.trim().is_empty() {
                return Err(Error::Catalog(format!(
                    "description for '{}' is empty",
                    label
                )));
            }
            if !seen.contains(label.as_str()) {
                warn!("Description for unknown label '{}' will never be shown", label);
            }
        }

        let catalog = Catalog {
            labels,
            descriptions,
        };

        for label in catalog.undescribed() {
            warn!("No description for '{}', falling back to placeholder", label);
        }

        Ok(catalog)
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Description for `label`, or [`FALLBACK_DESCRIPTION`]
    pub fn description(&self, label: &str) -> &str {
        self.descriptions
            .get(label)
            .map(String::as_str)
            .unwrap_or(FALLBACK_DESCRIPTION)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Labels that resolve to the fallback description
    pub fn undescribed(&self) -> Vec<&str> {
        self.labels()
            .filter(|label| !self.descriptions.contains_key(*label))
            .collect()
    }
}
