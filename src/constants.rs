// -
// Reserved identifiers

/// Sentinel app identifier meaning "applies to all apps".
pub const GLOBAL_APP_ID: &str = "global";

/// Reserved app identifier for platform-default ownership. Records tagged
/// with it rank between the requester's own records and the global fallback.
pub const DEFAULT_APP_ID: &str = "com.platform.default";

/// Reserved category under which dimension-axis bookkeeping tuples are
/// registered. Signatures whose tuples are all bookkeeping entries are not
/// real subscriptions and are skipped during dispatch collection.
pub(crate) const DIMENSION_AXIS_CATEGORY: &str = "__dimension_axis__";

/// Canonical signature for requests that carry no dimension object.
pub const EMPTY_DIMENSION_SIGNATURE: &str = "";

// -
// Merge scoring

/// Baseline condition score for records carrying no condition predicate.
pub(crate) const NON_CONDITION_SCORE: u8 = 1;

/// Condition score for records whose condition shares nothing with the
/// active device condition. Such records are excluded from the merge.
pub(crate) const NOT_MATCH_SCORE: u8 = 0;

/// Matching condition properties counted into the score are clamped here.
pub(crate) const CONDITION_MATCH_CAP: u8 = 15;

/// Record count beyond which the legacy bit-packed score ran out of
/// sequence bits. The explicit score struct cannot overflow; the anomaly is
/// still logged for operational parity.
pub(crate) const LEGACY_SEQUENCE_LIMIT: usize = 1 << 16;

/// Delimiter for country fields encoding multiple alternatives.
pub(crate) const COUNTRY_DELIMITER: char = ',';

// -
// Dispatch

/// Fixed overhead added to the pending count of a dispatch pass: the pass
/// itself holds one reference until every waiter has been visited.
pub(crate) const DISPATCH_PENDING_OVERHEAD: usize = 1;

// -
// Database namespaces

/// Sled database tree namespaces, one per record kind
pub(crate) const TREE_MAIN: &str = "_records_main_tree";
pub(crate) const TREE_MAIN_VOLATILE: &str = "_records_main_volatile_tree";
pub(crate) const TREE_DEFAULT: &str = "_records_default_tree";
pub(crate) const TREE_DEFAULT_COUNTRY: &str = "_records_default_country_tree";

/// File suffix for rendered category cache entries
pub(crate) const CACHE_FILE_SUFFIX: &str = ".cache.json";
