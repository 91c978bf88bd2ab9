/// Demographic attributes attached to a user row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demographics {
    pub gender: Option<String>,
    pub has_pronouns: bool,
}

/// Outcome of a demographic lookup for one enrichment pass.
///
/// Explicit signals come from profile pronouns; inferred ones from the
/// classification fallback. Both collaborators live behind a trait seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemographicSignal {
    Explicit { gender: Option<String> },
    Inferred { gender: Option<String> },
    Unavailable,
}

/// Enrichment lifecycle of an entity. Replaces the nested re-enrichment
/// conditionals with explicit transition rules per fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentState {
    /// Placeholder row, profile never fetched
    Unenriched,
    /// Profile fetched, demographics inferred (or absent)
    EnrichedInferred,
    /// Profile fetched, demographics backed by an explicit signal
    EnrichedExplicit,
}

impl EnrichmentState {
    /// Reconstruct the state from persisted columns
    pub fn from_columns(is_enriched: bool, has_pronouns: bool) -> Self {
        match (is_enriched, has_pronouns) {
            (false, _) => EnrichmentState::Unenriched,
            (true, false) => EnrichmentState::EnrichedInferred,
            (true, true) => EnrichmentState::EnrichedExplicit,
        }
    }

    /// Apply one enrichment pass.
    ///
    /// An explicit signal always wins. Without one, a first enrichment keeps
    /// whatever the signal inferred, while a re-enrichment preserves the
    /// previously stored demographics instead of overwriting them.
    pub fn apply(
        self,
        signal: DemographicSignal,
        previous: &Demographics,
    ) -> (EnrichmentState, Demographics) {
        match signal {
            DemographicSignal::Explicit { gender } => (
                EnrichmentState::EnrichedExplicit,
                Demographics {
                    gender,
                    has_pronouns: true,
                },
            ),
            DemographicSignal::Inferred { gender } => match self {
                EnrichmentState::Unenriched => (
                    EnrichmentState::EnrichedInferred,
                    Demographics {
                        gender,
                        has_pronouns: false,
                    },
                ),
                // Re-enrichment without an explicit signal keeps prior data.
                _ => (self, previous.clone()),
            },
            DemographicSignal::Unavailable => match self {
                EnrichmentState::Unenriched => {
                    (EnrichmentState::EnrichedInferred, Demographics::default())
                }
                _ => (self, previous.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior(gender: &str, has_pronouns: bool) -> Demographics {
        Demographics {
            gender: Some(gender.to_string()),
            has_pronouns,
        }
    }

    #[test]
    fn test_first_enrichment_uses_inference() {
        let (state, demo) = EnrichmentState::Unenriched.apply(
            DemographicSignal::Inferred {
                gender: Some("Female".into()),
            },
            &Demographics::default(),
        );
        assert_eq!(state, EnrichmentState::EnrichedInferred);
        assert_eq!(demo.gender.as_deref(), Some("Female"));
        assert!(!demo.has_pronouns);
    }

    #[test]
    fn test_explicit_signal_always_wins() {
        for start in [
            EnrichmentState::Unenriched,
            EnrichmentState::EnrichedInferred,
            EnrichmentState::EnrichedExplicit,
        ] {
            let (state, demo) = start.apply(
                DemographicSignal::Explicit {
                    gender: Some("Other".into()),
                },
                &prior("Male", false),
            );
            assert_eq!(state, EnrichmentState::EnrichedExplicit);
            assert_eq!(demo.gender.as_deref(), Some("Other"));
            assert!(demo.has_pronouns);
        }
    }

    #[test]
    fn test_reenrichment_preserves_prior_demographics() {
        let (state, demo) = EnrichmentState::EnrichedExplicit.apply(
            DemographicSignal::Unavailable,
            &prior("Female", true),
        );
        assert_eq!(state, EnrichmentState::EnrichedExplicit);
        assert_eq!(demo, prior("Female", true));

        let (state, demo) = EnrichmentState::EnrichedInferred.apply(
            DemographicSignal::Inferred {
                gender: Some("Male".into()),
            },
            &prior("Female", false),
        );
        assert_eq!(state, EnrichmentState::EnrichedInferred);
        assert_eq!(demo.gender.as_deref(), Some("Female"));
    }

    #[test]
    fn test_state_from_columns() {
        assert_eq!(
            EnrichmentState::from_columns(false, true),
            EnrichmentState::Unenriched
        );
        assert_eq!(
            EnrichmentState::from_columns(true, false),
            EnrichmentState::EnrichedInferred
        );
        assert_eq!(
            EnrichmentState::from_columns(true, true),
            EnrichmentState::EnrichedExplicit
        );
    }
}
