//! Structured query descriptions sent to the query collaborator.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::Record;
use crate::model::RecordKind;

/// Supported predicate operator. The store contract only requires
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueryOp {
    #[default]
    #[serde(rename = "=")]
    Eq,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPredicate {
    pub prop: String,
    #[serde(default)]
    pub op: QueryOp,
    pub val: Value,
}

/// One structured query: `{from: kindName, where: [{prop, op, val}],
/// select: [...]}`. An empty `select` returns every value key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub from: RecordKind,
    #[serde(default, rename = "where")]
    pub predicates: Vec<QueryPredicate>,
    #[serde(default)]
    pub select: Vec<String>,
}

impl QuerySpec {
    pub fn from_kind(kind: RecordKind) -> Self {
        QuerySpec {
            from: kind,
            predicates: Vec::new(),
            select: Vec::new(),
        }
    }

    pub fn where_eq(
        mut self,
        prop: &str,
        val: impl Into<Value>,
    ) -> Self {
        self.predicates.push(QueryPredicate {
            prop: prop.to_string(),
            op: QueryOp::Eq,
            val: val.into(),
        });
        self
    }

    pub fn select_keys(
        mut self,
        keys: &[String],
    ) -> Self {
        self.select = keys.to_vec();
        self
    }

    /// Whether `record` satisfies every predicate. Predicates address the
    /// record's metadata fields, not its value map.
    pub(crate) fn matches(
        &self,
        record: &Record,
    ) -> bool {
        self.predicates.iter().all(|p| {
            let actual: Value = match p.prop.as_str() {
                "category" => Value::String(record.category.clone()),
                "appId" => Value::String(record.app_id.clone()),
                "country" => record
                    .country
                    .as_ref()
                    .map(|c| Value::String(c.clone()))
                    .unwrap_or(Value::Null),
                "kind" => Value::String(record.kind.as_str().to_string()),
                _ => Value::Null,
            };
            actual == p.val
        })
    }

    /// Reduce a matched record to the selected value keys.
    pub(crate) fn project(
        &self,
        mut record: Record,
    ) -> Record {
        if !self.select.is_empty() {
            record.value.retain(|key, _| self.select.iter().any(|s| s == key));
        }
        record
    }
}
