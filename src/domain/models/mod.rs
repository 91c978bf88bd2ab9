pub mod enrichment;
pub mod profile;
pub mod sponsorship;

pub use enrichment::{DemographicSignal, Demographics, EnrichmentState};
pub use profile::{AccountKind, UserProfile};
pub use sponsorship::SponsorshipSnapshot;
