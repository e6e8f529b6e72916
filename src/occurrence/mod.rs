/// Geolocated occurrence records and their retrieval
pub mod fetch;

use crate::taxonomy::TaxonId;
use serde::{Deserialize, Serialize};

pub use fetch::{FetchLimits, GroupFetch, OccurrenceFetcher, OccurrenceSource};

/// An occurrence as the service reports it: coordinates and species may
/// all be missing. Validation happens in the fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOccurrence {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub species: Option<String>,
}

/// A validated, geolocated occurrence. Ephemeral: built per fetch and
/// discarded after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccurrenceRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub species: Option<String>,
    pub group: TaxonId,
}

impl RawOccurrence {
    /// Keep the record only if it carries both coordinates.
    pub fn validate(self, group: TaxonId) -> Option<OccurrenceRecord> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(OccurrenceRecord {
                latitude,
                longitude,
                species: self.species,
                group,
            }),
            _ => None,
        }
    }
}
