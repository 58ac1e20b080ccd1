pub mod disease;
pub mod severity;

pub use disease::{DiseaseProfile, DEFAULT_DISEASE_KEY, HEALTHY_KEY};
pub use severity::{classify, infection_level, score, SeverityScore};
