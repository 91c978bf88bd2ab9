//! Boundary for demographic signals.
//!
//! Pronoun scraping and text-classification inference are external
//! collaborators. The worker only consumes the resulting signal; deployments
//! without those collaborators run with the disabled source.

use async_trait::async_trait;

use crate::domain::models::DemographicSignal;

/// Source of demographic signals for a user account
#[async_trait]
pub trait DemographicSource: Send + Sync {
    /// Resolve a signal for one account. Must never fail the enrichment
    /// pass; sources degrade to `Unavailable` on their own errors.
    async fn resolve(
        &self,
        username: &str,
        name: Option<&str>,
        country: Option<&str>,
    ) -> DemographicSignal;
}

/// Default source used when no external collaborator is configured
pub struct DisabledDemographics;

#[async_trait]
impl DemographicSource for DisabledDemographics {
    async fn resolve(
        &self,
        _username: &str,
        _name: Option<&str>,
        _country: Option<&str>,
    ) -> DemographicSignal {
        DemographicSignal::Unavailable
    }
}
