//! Station and field registry.
//!
//! Every station is described by an ordered list of field descriptors loaded
//! once at startup from a TOML document:
//!
//! ```toml
//! [[fields]]
//! name = "wl_mm"
//! column = "WL_mm"
//! parameter = "Water level"
//! code = "WL"
//! unit = "mm"
//!
//! [[stations]]
//! id = "slatinny_potok"
//! label = "Slatinný potok"
//! fields = ["wl_mm"]
//! ```
//!
//! A [`Field`] can only be obtained through [`Station::field`], so every
//! store query that takes one is working with a column that is known to
//! exist for that station.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::Error;

const IDENTIFIER_PATTERN: &str = "^[a-z0-9_]+$";

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read station registry {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse station registry: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid {kind} identifier '{value}', expected lowercase letters, digits and '_'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("Duplicate {kind} '{value}'")]
    Duplicate { kind: &'static str, value: String },
    #[error("Field '{0}' has an empty column name")]
    EmptyColumn(String),
    #[error("Station '{station}' references undefined field '{field}'")]
    UndefinedField { station: String, field: String },
}

/// Metadata for a measurable quantity and the store column holding it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
    /// Name used in API paths, e.g. `wl_mm`
    pub name: String,
    /// Column name in the station's parquet files, e.g. `WL_mm`
    pub column: String,
    /// Human readable parameter name
    pub parameter: String,
    /// Short code used in the source data files
    pub code: String,
    pub unit: String,
}

impl Field {
    /// The column as a double-quoted SQL identifier.
    pub fn quoted_column(&self) -> String {
        format!("\"{}\"", self.column.replace('"', "\"\""))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub label: Option<String>,
    fields: Vec<Field>,
}

impl Station {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Resolves a requested field name against this station's schema.
    pub fn field(&self, name: &str) -> Result<&Field, Error> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::InvalidField {
                station: self.id.clone(),
                field: name.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    stations: BTreeMap<String, Station>,
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    stations: Vec<StationEntry>,
}

#[derive(Deserialize)]
struct StationEntry {
    id: String,
    label: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
}

impl Registry {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_toml(&content)?;
        for station in registry.stations.values() {
            debug!(
                "station {} ({}) measures {} fields",
                station.id,
                station.label.as_deref().unwrap_or("no label"),
                station.fields().len()
            );
        }
        info!(
            "Loaded {} stations from {}",
            registry.stations.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = toml::from_str(content)?;
        let identifier = Regex::new(IDENTIFIER_PATTERN)?;

        let mut fields: HashMap<String, Field> = HashMap::new();
        for field in document.fields {
            if !identifier.is_match(&field.name) {
                return Err(RegistryError::InvalidIdentifier {
                    kind: "field",
                    value: field.name,
                });
            }
            if field.column.trim().is_empty() {
                return Err(RegistryError::EmptyColumn(field.name));
            }
            if fields.contains_key(&field.name) {
                return Err(RegistryError::Duplicate {
                    kind: "field",
                    value: field.name,
                });
            }
            fields.insert(field.name.clone(), field);
        }

        let mut stations = BTreeMap::new();
        for entry in document.stations {
            if !identifier.is_match(&entry.id) {
                return Err(RegistryError::InvalidIdentifier {
                    kind: "station",
                    value: entry.id,
                });
            }
            if stations.contains_key(&entry.id) {
                return Err(RegistryError::Duplicate {
                    kind: "station",
                    value: entry.id,
                });
            }

            let mut seen = HashSet::new();
            let mut station_fields = Vec::with_capacity(entry.fields.len());
            for name in &entry.fields {
                let field = fields
                    .get(name)
                    .ok_or_else(|| RegistryError::UndefinedField {
                        station: entry.id.clone(),
                        field: name.clone(),
                    })?;
                if !seen.insert(name.as_str()) {
                    return Err(RegistryError::Duplicate {
                        kind: "station field",
                        value: format!("{}.{}", entry.id, name),
                    });
                }
                station_fields.push(field.clone());
            }

            stations.insert(
                entry.id.clone(),
                Station {
                    id: entry.id,
                    label: entry.label,
                    fields: station_fields,
                },
            );
        }

        Ok(Self { stations })
    }

    pub fn station(&self, id: &str) -> Result<&Station, Error> {
        self.stations
            .get(id)
            .ok_or_else(|| Error::UnknownStation(id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
