//! JSON-file-backed [`KeySchema`] implementation.
//!
//! The schema definition is loaded once at startup; only per-axis dimension
//! value objects mutate afterwards (driven by dimension-change events).

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use dashmap::DashMap;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::KeyDbType;
use super::KeyDescription;
use super::KeySchema;
use crate::constants::GLOBAL_APP_ID;
use crate::model::DimensionMap;
use crate::Result;

/// Declaration of a single setting key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyDefinition {
    #[serde(default)]
    pub db_type: KeyDbType,

    /// Eligible for per-app storage and per-app change reconciliation
    #[serde(default)]
    pub per_app: bool,

    /// Accepts volatile overlay values
    #[serde(default)]
    pub volatile: bool,

    /// Dimension axes this key's value depends on
    #[serde(default)]
    pub dimensions: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<KeyDescription>,

    /// Per-app description overrides, keyed by app id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub app_descriptions: BTreeMap<String, KeyDescription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryDefinition {
    #[serde(default)]
    pub keys: BTreeMap<String, KeyDefinition>,
}

/// Full schema document as shipped on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDefinition>,
}

pub struct StaticKeySchema {
    definition: SchemaDefinition,

    /// key -> owning category, derived once from the definition
    key_category: BTreeMap<String, String>,

    /// Current dimension value object per axis
    dimension_values: DashMap<String, DimensionMap>,
}

impl StaticKeySchema {
    pub fn new(definition: SchemaDefinition) -> Self {
        let mut key_category = BTreeMap::new();
        for (category, def) in &definition.categories {
            for key in def.keys.keys() {
                if key_category.insert(key.clone(), category.clone()).is_some() {
                    warn!("key '{}' declared in more than one category", key);
                }
            }
        }
        StaticKeySchema {
            definition,
            key_category,
            dimension_values: DashMap::new(),
        }
    }

    /// Load the schema document once at startup. A missing file yields an
    /// empty schema: every key then resolves as a plain Normal key.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no schema file at {:?}, using empty schema", path);
            return Ok(StaticKeySchema::new(SchemaDefinition::default()));
        }
        let definition: SchemaDefinition = crate::utils::read_json_file(path)?;
        info!("loaded key schema with {} categories", definition.categories.len());
        Ok(StaticKeySchema::new(definition))
    }

    fn key_definition(
        &self,
        key: &str,
    ) -> Option<&KeyDefinition> {
        let category = self.key_category.get(key)?;
        self.definition.categories.get(category)?.keys.get(key)
    }
}

impl KeySchema for StaticKeySchema {
    fn db_type(
        &self,
        key: &str,
    ) -> KeyDbType {
        self.key_definition(key).map(|d| d.db_type).unwrap_or_default()
    }

    fn keys_in_category(
        &self,
        category: &str,
    ) -> BTreeSet<String> {
        self.definition
            .categories
            .get(category)
            .map(|def| def.keys.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn dependent_dimensions(
        &self,
        key: &str,
    ) -> BTreeSet<String> {
        self.key_definition(key).map(|d| d.dimensions.clone()).unwrap_or_default()
    }

    fn split_global_per_app(
        &self,
        _category: &str,
        keys: &BTreeSet<String>,
        app_id: &str,
    ) -> (BTreeSet<String>, BTreeSet<String>) {
        if app_id == GLOBAL_APP_ID {
            return (keys.clone(), BTreeSet::new());
        }
        let mut global = BTreeSet::new();
        let mut per_app = BTreeSet::new();
        for key in keys {
            let is_per_app = self.key_definition(key).map(|d| d.per_app).unwrap_or(false);
            if is_per_app {
                per_app.insert(key.clone());
            } else {
                global.insert(key.clone());
            }
        }
        (global, per_app)
    }

    fn dimension_values(
        &self,
        axis: &str,
    ) -> Option<DimensionMap> {
        self.dimension_values.get(axis).map(|entry| entry.value().clone())
    }

    fn update_dimension_values(
        &self,
        axis: &str,
        values: DimensionMap,
    ) {
        self.dimension_values.insert(axis.to_string(), values);
    }

    fn is_volatile(
        &self,
        key: &str,
    ) -> bool {
        self.key_definition(key).map(|d| d.volatile).unwrap_or(false)
    }

    fn describe_key(
        &self,
        key: &str,
        app_id: &str,
    ) -> Option<KeyDescription> {
        let def = self.key_definition(key)?;
        if let Some(desc) = def.app_descriptions.get(app_id) {
            return Some(desc.clone());
        }
        def.description.clone()
    }
}
