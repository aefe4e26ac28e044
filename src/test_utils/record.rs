//! Record builders for tests.

use serde_json::Value;

use crate::constants::GLOBAL_APP_ID;
use crate::model::Record;
use crate::model::RecordKind;
use crate::model::ValueMap;

pub fn value_map(entries: &[(&str, Value)]) -> ValueMap {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn with_kind(
    kind: RecordKind,
    app_id: &str,
    category: &str,
    entries: &[(&str, Value)],
) -> Record {
    Record {
        kind,
        app_id: app_id.to_string(),
        category: category.to_string(),
        country: None,
        condition: None,
        value: value_map(entries),
    }
}

/// Shipped default owned by the global app.
pub fn default_global(
    category: &str,
    entries: &[(&str, Value)],
) -> Record {
    with_kind(RecordKind::Default, GLOBAL_APP_ID, category, entries)
}

/// Main/system override owned by the global app.
pub fn main_global(
    category: &str,
    entries: &[(&str, Value)],
) -> Record {
    with_kind(RecordKind::Main, GLOBAL_APP_ID, category, entries)
}

/// Main/system override owned by a specific app.
pub fn main_for_app(
    app_id: &str,
    category: &str,
    entries: &[(&str, Value)],
) -> Record {
    with_kind(RecordKind::Main, app_id, category, entries)
}

/// Attach a condition predicate to a record.
pub fn conditioned(
    mut record: Record,
    predicate: &[(&str, Value)],
) -> Record {
    record.condition = Some(predicate.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());
    record
}

/// Attach country scoping to a record.
pub fn for_country(
    mut record: Record,
    country: &str,
) -> Record {
    record.country = Some(country.to_string());
    record
}
