/// Cached access to the external taxonomy service
use super::cache::SingleFlightCache;
use super::{Taxon, TaxonId};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Seam over the external taxonomy service. `Ok(None)` means the service
/// answered but the taxon is absent or malformed (non-fatal); `Err` is a
/// transport-level failure the caller may retry.
#[async_trait]
pub trait TaxonomyProvider: Send + Sync {
    async fn match_name(&self, name: &str) -> Result<Option<Taxon>>;

    async fn taxon_detail(&self, id: TaxonId) -> Result<Option<Taxon>>;

    /// Immediate children of a taxon, unordered, possibly mixed-rank.
    async fn children(&self, id: TaxonId, limit: usize) -> Result<Vec<Taxon>>;
}

/// Taxonomy client with a shared resolution cache.
///
/// Every lookup is memoized by name or id with single-flight semantics:
/// a cache hit makes no external call, and concurrent misses on the same
/// key trigger exactly one provider call.
pub struct TaxonClient<P> {
    provider: Arc<P>,
    children_limit: usize,
    by_name: SingleFlightCache<String, Option<Taxon>>,
    by_id: SingleFlightCache<TaxonId, Option<Taxon>>,
    children: SingleFlightCache<TaxonId, Vec<Taxon>>,
}

impl<P: TaxonomyProvider> TaxonClient<P> {
    pub fn new(provider: Arc<P>, children_limit: usize) -> Self {
        Self {
            provider,
            children_limit,
            by_name: SingleFlightCache::new(),
            by_id: SingleFlightCache::new(),
            children: SingleFlightCache::new(),
        }
    }

    /// Resolve a taxon by name. Name keys are normalized so "Aves" and
    /// " aves " share a cache slot.
    pub async fn resolve_by_name(&self, name: &str) -> Result<Option<Taxon>> {
        let key = name.trim().to_ascii_lowercase();
        self.by_name
            .get_or_populate(key, || async {
                tracing::debug!(name, "resolving taxon by name");
                self.provider.match_name(name.trim()).await
            })
            .await
    }

    pub async fn fetch_by_id(&self, id: TaxonId) -> Result<Option<Taxon>> {
        self.by_id
            .get_or_populate(id, || async {
                tracing::debug!(id, "fetching taxon detail");
                self.provider.taxon_detail(id).await
            })
            .await
    }

    /// Children of `id`, ordered by scientific name ascending,
    /// case-insensitive. Cached per id.
    pub async fn children(&self, id: TaxonId) -> Result<Vec<Taxon>> {
        self.children
            .get_or_populate(id, || async {
                tracing::debug!(id, limit = self.children_limit, "listing children");
                let mut children = self.provider.children(id, self.children_limit).await?;
                children.sort_by_cached_key(|t| t.scientific_name.to_lowercase());
                Ok(children)
            })
            .await
    }
}
