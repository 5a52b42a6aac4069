// crates/placedex-core/src/model.rs
use crate::category::Category;
use crate::raw::PlaceRaw;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Hash field holding the display name.
pub const FIELD_NAME: &str = "name";
/// Hash field holding the category label.
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_ID: &str = "id";

/// A harvested location record.
///
/// Lives in the store as a hash with a 48 hour expiry that every harvest
/// refreshes; a missing record means the place is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Every other upstream field, flattened to strings.
    pub attributes: BTreeMap<String, String>,
}

impl Place {
    /// Build from an upstream record. `None` when the record lacks an id or name.
    pub fn from_raw(raw: PlaceRaw, category: Category) -> Option<Self> {
        let id = raw.id.filter(|s| !s.is_empty())?;
        let name = raw.name?;
        let attributes = raw
            .attributes
            .into_iter()
            .filter(|(k, _)| k != FIELD_CATEGORY)
            .map(|(k, v)| (k, value_to_field(v)))
            .collect();
        Some(Place {
            id,
            name,
            category,
            attributes,
        })
    }

    /// Flatten into hash fields, pass-through attributes included.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.push((FIELD_ID.to_owned(), self.id.clone()));
        fields.push((FIELD_NAME.to_owned(), self.name.clone()));
        fields.push((FIELD_CATEGORY.to_owned(), self.category.label().to_owned()));
        fields
    }

    /// Rebuild from hash fields read back from the store.
    pub fn from_fields(id: &str, mut fields: BTreeMap<String, String>) -> Option<Self> {
        let name = fields.remove(FIELD_NAME)?;
        let category = fields.remove(FIELD_CATEGORY)?.parse().ok()?;
        fields.remove(FIELD_ID);
        Some(Place {
            id: id.to_owned(),
            name,
            category,
            attributes: fields,
        })
    }
}

fn value_to_field(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub category: String,
}

/// Outcome of the prune pass that opens every harvest cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub checked: usize,
    pub pruned: usize,
}

/// Outcome of harvesting one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub category: Category,
    /// Size the upstream announced; `None` when the count request failed.
    pub expected: Option<u64>,
    pub places: usize,
    pub pages_ok: usize,
    pub pages_failed: usize,
    /// Set when the whole category was abandoned for this cycle.
    pub error: Option<String>,
}

impl HarvestReport {
    pub fn new(category: Category) -> Self {
        HarvestReport {
            category,
            expected: None,
            places: 0,
            pages_ok: 0,
            pages_failed: 0,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.pages_failed == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub pruned: PruneReport,
    pub categories: Vec<HarvestReport>,
}

impl CycleReport {
    pub fn places(&self) -> usize {
        self.categories.iter().map(|c| c.places).sum()
    }
}
