//! Active device condition and condition scoring.
//!
//! The condition is the current device/environment predicate mapping,
//! loaded once at startup and immutable thereafter. Changing it requires a
//! service restart.

use std::path::Path;

use tracing::info;

use crate::constants::CONDITION_MATCH_CAP;
use crate::constants::NON_CONDITION_SCORE;
use crate::constants::NOT_MATCH_SCORE;
use crate::model::ConditionMap;
use crate::model::Record;
use crate::Result;

/// Current device/environment predicates (e.g. panel type, form factor).
#[derive(Debug, Clone, Default)]
pub struct Condition {
    properties: ConditionMap,
}

impl Condition {
    pub fn new(properties: ConditionMap) -> Self {
        Condition { properties }
    }

    /// Load the condition file once at startup. A missing file yields the
    /// empty condition: every conditioned record then scores NOT_MATCH and
    /// only unconditioned records survive the merge.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no condition file at {:?}, using empty condition", path);
            return Ok(Condition::default());
        }
        let properties: ConditionMap = crate::utils::read_json_file(path)?;
        info!("loaded device condition with {} properties", properties.len());
        Ok(Condition { properties })
    }

    pub fn properties(&self) -> &ConditionMap {
        &self.properties
    }

    /// Score a candidate record against the active condition.
    ///
    /// - no condition / empty condition map -> NON_CONDITION baseline
    /// - zero properties equal in both maps (key AND value) -> NOT_MATCH;
    ///   the record must be excluded from the merge entirely
    /// - otherwise NON_CONDITION + matching-property count, clamped so more
    ///   specific matches outrank less specific ones without growing
    ///   unbounded
    pub fn score(
        &self,
        record: &Record,
    ) -> u8 {
        let condition = match &record.condition {
            None => return NON_CONDITION_SCORE,
            Some(c) if c.is_empty() => return NON_CONDITION_SCORE,
            Some(c) => c,
        };

        let matched = condition
            .iter()
            .filter(|(prop, expected)| self.properties.get(*prop) == Some(expected))
            .count()
            .min(CONDITION_MATCH_CAP as usize) as u8;

        if matched == 0 {
            NOT_MATCH_SCORE
        } else {
            NON_CONDITION_SCORE + matched
        }
    }
}
