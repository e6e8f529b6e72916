/// GBIF v1 adapter implementing the taxonomy and occurrence seams
use crate::config::TaxonomyConfig;
use crate::occurrence::{OccurrenceSource, RawOccurrence};
use crate::taxonomy::client::TaxonomyProvider;
use crate::taxonomy::{Rank, Taxon, TaxonId};
use crate::{HexrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct GbifClient {
    client: Client,
    base_url: String,
}

impl GbifClient {
    pub fn new(config: &TaxonomyConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hexrich/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| HexrichError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| HexrichError::Resolution(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| HexrichError::Resolution(format!("{}: {}", url, e)))?;

        response
            .json::<T>()
            .await
            .map_err(|e| HexrichError::Resolution(format!("{}: invalid response: {}", url, e)))
    }
}

// Wire shapes: only the fields consumed. Everything optional, because the
// service omits fields freely and absence must read as NotFound, not error.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchResponse {
    usage_key: Option<TaxonId>,
    scientific_name: Option<String>,
    rank: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeciesDetail {
    key: Option<TaxonId>,
    scientific_name: Option<String>,
    vernacular_name: Option<String>,
    rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PagedResults<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceEntry {
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    species: Option<String>,
}

impl SpeciesDetail {
    /// A taxon needs an id, a name, and a rank on our ladder; anything
    /// less is treated as absent.
    fn into_taxon(self) -> Option<Taxon> {
        Some(Taxon {
            id: self.key?,
            scientific_name: self.scientific_name?,
            common_name: self.vernacular_name,
            rank: Rank::parse(&self.rank?)?,
        })
    }
}

#[async_trait]
impl TaxonomyProvider for GbifClient {
    async fn match_name(&self, name: &str) -> Result<Option<Taxon>> {
        let url = format!("{}/species/match", self.base_url);
        let matched: MatchResponse = self
            .get_json(&url, &[("name", name.to_string())])
            .await?;

        // The match endpoint has no vernacular name; pull the full detail
        // so tree labels can show it.
        match matched.usage_key {
            Some(key) => self.taxon_detail(key).await.map(|detail| {
                detail.or_else(|| {
                    Some(Taxon {
                        id: key,
                        scientific_name: matched.scientific_name?,
                        common_name: None,
                        rank: Rank::parse(&matched.rank?)?,
                    })
                })
            }),
            None => Ok(None),
        }
    }

    async fn taxon_detail(&self, id: TaxonId) -> Result<Option<Taxon>> {
        let url = format!("{}/species/{}", self.base_url, id);
        let detail: SpeciesDetail = self.get_json(&url, &[]).await?;
        Ok(detail.into_taxon())
    }

    async fn children(&self, id: TaxonId, limit: usize) -> Result<Vec<Taxon>> {
        let url = format!("{}/species/{}/children", self.base_url, id);
        let page: PagedResults<SpeciesDetail> = self
            .get_json(&url, &[("limit", limit.to_string())])
            .await?;

        // Malformed entries are skipped, never fatal.
        Ok(page
            .results
            .into_iter()
            .filter_map(SpeciesDetail::into_taxon)
            .collect())
    }
}

#[async_trait]
impl OccurrenceSource for GbifClient {
    async fn page(
        &self,
        group: TaxonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawOccurrence>> {
        let url = format!("{}/occurrence/search", self.base_url);
        let page: PagedResults<OccurrenceEntry> = self
            .get_json(
                &url,
                &[
                    ("taxonKey", group.to_string()),
                    ("hasCoordinate", "true".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await
            .map_err(|e| HexrichError::Occurrence(e.to_string()))?;

        Ok(page
            .results
            .into_iter()
            .map(|entry| RawOccurrence {
                latitude: entry.decimal_latitude,
                longitude: entry.decimal_longitude,
                species: entry.species,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_without_rank_is_absent() {
        let detail = SpeciesDetail {
            key: Some(1),
            scientific_name: Some("Animalia".to_string()),
            vernacular_name: None,
            rank: Some("GENUS".to_string()),
        };
        assert!(detail.into_taxon().is_none());

        let missing_name = SpeciesDetail {
            key: Some(1),
            scientific_name: None,
            vernacular_name: None,
            rank: Some("KINGDOM".to_string()),
        };
        assert!(missing_name.into_taxon().is_none());
    }

    #[test]
    fn detail_maps_vernacular_to_common_name() {
        let detail = SpeciesDetail {
            key: Some(212),
            scientific_name: Some("Aves".to_string()),
            vernacular_name: Some("Birds".to_string()),
            rank: Some("class".to_string()),
        };
        let taxon = detail.into_taxon().unwrap();
        assert_eq!(taxon.rank, Rank::Class);
        assert_eq!(taxon.common_name.as_deref(), Some("Birds"));
    }

    #[test]
    fn wire_fields_deserialize_from_service_names() {
        let entry: OccurrenceEntry = serde_json::from_str(
            r#"{"decimalLatitude": 10.5, "decimalLongitude": -3.25, "species": "Corvus corax"}"#,
        )
        .unwrap();
        assert_eq!(entry.decimal_latitude, Some(10.5));
        assert_eq!(entry.decimal_longitude, Some(-3.25));

        let sparse: OccurrenceEntry = serde_json::from_str(r#"{"species": null}"#).unwrap();
        assert!(sparse.decimal_latitude.is_none());

        let paged: PagedResults<OccurrenceEntry> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(paged.results.is_empty());
    }
}
