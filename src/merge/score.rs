//! Composite merge priority.
//!
//! The legacy implementation packed these fields into one integer with
//! reserved bit ranges; that scheme overflows when field widths are
//! exceeded. Here the score is an explicit struct compared
//! lexicographically, field order = significance order. Only the relative
//! ordering is contractual, never the numeric values.

/// App-ownership tier of a record relative to the requesting app.
/// Records owned by any other app are rejected before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum OwnershipTier {
    /// Record app id equals the global sentinel
    Global = 1,
    /// Record app id equals the reserved default app
    DefaultApp = 2,
    /// Record app id equals the requester's app id
    Requester = 3,
}

/// Per-record merge priority; higher compares greater. Records are applied
/// in ascending score order so the highest-scored record writes last and
/// wins per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct PriorityScore {
    /// System-kind scope tier: system-and-per-app > system-and-default-app
    /// > system-and-global > non-system (0)
    pub app_scope: u8,

    pub ownership: OwnershipTier,

    /// Condition score from the active-condition match (>= 1 once accepted)
    pub condition: u8,

    /// Source-kind tier: Main > MainVolatile > Default
    pub kind: u8,

    /// Country tier: matching explicit scope > no scope
    pub country: u8,

    /// Original sequence index; strictly increasing, so no two records in
    /// one merge call ever compare equal and insertion order stays
    /// deterministic when all semantic fields collide.
    pub sequence: usize,
}

impl PriorityScore {
    pub(crate) fn app_scope_tier(
        is_system_kind: bool,
        ownership: OwnershipTier,
    ) -> u8 {
        if !is_system_kind {
            return 0;
        }
        match ownership {
            OwnershipTier::Requester => 3,
            OwnershipTier::DefaultApp => 2,
            OwnershipTier::Global => 1,
        }
    }
}
