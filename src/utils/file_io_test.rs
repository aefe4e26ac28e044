use std::collections::BTreeMap;

use serde_json::json;

use crate::utils::read_json_file;
use crate::utils::write_json_file;

#[test]
fn test_write_then_read_json_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("values.json");

    let mut map = BTreeMap::new();
    map.insert("backlight".to_string(), json!(100));
    map.insert("panel".to_string(), json!("OLED"));

    write_json_file(&path, &map).expect("write");
    let loaded: BTreeMap<String, serde_json::Value> = read_json_file(&path).expect("read");

    assert_eq!(loaded, map);
}

#[test]
fn test_read_missing_file_is_path_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");

    let result: crate::Result<BTreeMap<String, serde_json::Value>> = read_json_file(&path);
    assert!(result.is_err());
}
