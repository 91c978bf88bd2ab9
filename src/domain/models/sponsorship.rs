use std::collections::HashSet;

/// Complete relationship data fetched for one entity in one cycle.
///
/// Both lists are only ever complete: a fetch that cannot produce the full
/// list fails instead of returning a truncated snapshot.
#[derive(Debug, Clone, Default)]
pub struct SponsorshipSnapshot {
    /// Public sponsors of this entity
    pub sponsors: Vec<i64>,
    /// Entities this entity sponsors
    pub sponsoring: Vec<i64>,
    /// Sponsors whose identity is withheld; counted only
    pub private_sponsor_count: i32,
    /// Lowest recurring monthly tier in cents, if a public listing exists
    pub min_tier_cents: Option<i64>,
}

impl SponsorshipSnapshot {
    /// Union of every identity referenced by this snapshot
    pub fn referenced_ids(&self) -> HashSet<i64> {
        self.sponsors
            .iter()
            .chain(self.sponsoring.iter())
            .copied()
            .collect()
    }

    /// Whether the snapshot carries any relationship at all
    pub fn has_relationships(&self) -> bool {
        !self.sponsors.is_empty() || !self.sponsoring.is_empty()
    }
}
