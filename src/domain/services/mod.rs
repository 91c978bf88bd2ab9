pub mod demographics;
pub mod edge_diff;
pub mod node_token;

pub use demographics::{DemographicSource, DisabledDemographics};
pub use edge_diff::EdgeDiff;
