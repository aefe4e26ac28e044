//! In-memory schema fixtures for tests.

use std::collections::BTreeMap;

use serde_json::json;

use crate::schema::CategoryDefinition;
use crate::schema::KeyDbType;
use crate::schema::KeyDefinition;
use crate::schema::KeyDescription;
use crate::schema::SchemaDefinition;
use crate::schema::StaticKeySchema;

/// Schema used across merge/dispatch tests:
/// - category "option": backlight (volatile), volume, country,
///   smartServiceCountryCode2, pictureMode (mixed, per-app, depends on
///   input_source), soundMode (exception, per-app)
/// - category "network": ipv6 (normal)
pub fn fixture() -> StaticKeySchema {
    let mut option_keys = BTreeMap::new();
    option_keys.insert(
        "backlight".to_string(),
        KeyDefinition {
            volatile: true,
            ..Default::default()
        },
    );
    option_keys.insert("volume".to_string(), KeyDefinition::default());
    option_keys.insert("country".to_string(), KeyDefinition::default());
    option_keys.insert("smartServiceCountryCode2".to_string(), KeyDefinition::default());
    option_keys.insert(
        "pictureMode".to_string(),
        KeyDefinition {
            db_type: KeyDbType::Mixed,
            per_app: true,
            dimensions: ["input_source".to_string()].into_iter().collect(),
            description: Some(KeyDescription {
                ui: json!({"label": "Picture Mode"}),
                values: json!(["vivid", "standard", "cinema"]),
                extra: json!(null),
            }),
            app_descriptions: BTreeMap::from([(
                "app.photo".to_string(),
                KeyDescription {
                    ui: json!({"label": "Photo Picture Mode"}),
                    values: json!(["vivid", "standard"]),
                    extra: json!(null),
                },
            )]),
            ..Default::default()
        },
    );
    option_keys.insert(
        "soundMode".to_string(),
        KeyDefinition {
            db_type: KeyDbType::Exception,
            per_app: true,
            ..Default::default()
        },
    );

    let mut network_keys = BTreeMap::new();
    network_keys.insert("ipv6".to_string(), KeyDefinition::default());

    let mut categories = BTreeMap::new();
    categories.insert("option".to_string(), CategoryDefinition { keys: option_keys });
    categories.insert("network".to_string(), CategoryDefinition { keys: network_keys });

    StaticKeySchema::new(SchemaDefinition { categories })
}
