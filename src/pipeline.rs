/// Selection handling and the fetch-then-aggregate pipeline
use crate::hex::{self, HexCell};
use crate::occurrence::{OccurrenceFetcher, OccurrenceSource};
use crate::taxonomy::{Taxon, TaxonId};
use crate::{HexrichError, Result};
use h3o::Resolution;
use std::collections::HashSet;

/// The set of selected family-rank taxa. Owned by the caller, mutated
/// only through explicit select/deselect, and persists across pipeline
/// runs. Mutation never performs I/O.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    families: HashSet<TaxonId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a taxon to the selection. Only terminal (family-rank) taxa are
    /// accepted; anything else is refused and the set is unchanged.
    pub fn select(&mut self, taxon: &Taxon) -> bool {
        if !taxon.rank.is_terminal() {
            return false;
        }
        self.families.insert(taxon.id)
    }

    pub fn deselect(&mut self, id: TaxonId) -> bool {
        self.families.remove(&id)
    }

    pub fn contains(&self, id: TaxonId) -> bool {
        self.families.contains(&id)
    }

    pub fn clear(&mut self) {
        self.families.clear();
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Selected ids in a stable order, for a deterministic fan-out.
    pub fn ids(&self) -> Vec<TaxonId> {
        let mut ids: Vec<TaxonId> = self.families.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Where the pipeline stands. Selection changes never move the state
/// past `Selecting`; only an explicit `run` walks the later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Selecting,
    Fetching,
    Aggregating,
    Rendered,
}

/// Result of a pipeline run. `NoData` is an explicit marker: the run
/// completed but no valid coordinates came back, which is not an error
/// and not the same as never having run.
#[derive(Debug, PartialEq)]
pub enum PipelineOutcome {
    NoData,
    Cells(Vec<HexCell>),
}

/// Drives fetch fan-out and aggregation over a caller-owned selection.
pub struct Pipeline<S> {
    fetcher: OccurrenceFetcher<S>,
    state: PipelineState,
}

impl<S: OccurrenceSource> Pipeline<S> {
    pub fn new(fetcher: OccurrenceFetcher<S>) -> Self {
        Self {
            fetcher,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Note that the caller is mutating the selection. No I/O happens
    /// here or in any SelectionSet operation.
    pub fn begin_selection(&mut self) {
        self.state = PipelineState::Selecting;
    }

    /// The only path that fetches and aggregates: fan out over the
    /// selection, join all group fetches, then reduce once.
    ///
    /// Partial degradation is preferred over total failure; only a run in
    /// which every group failed outright surfaces an error.
    pub async fn run(
        &mut self,
        selection: &SelectionSet,
        resolution: Resolution,
    ) -> Result<PipelineOutcome> {
        if selection.is_empty() {
            self.state = PipelineState::Rendered;
            return Ok(PipelineOutcome::NoData);
        }

        self.state = PipelineState::Fetching;
        let fetches = self.fetcher.fetch_all(selection).await;

        // Barrier passed: every group completed or definitively failed.
        self.state = PipelineState::Aggregating;

        let group_count = fetches.len();
        let failed_count = fetches.iter().filter(|f| f.is_total_failure()).count();
        let records: Vec<_> = fetches.into_iter().flat_map(|f| f.records).collect();

        tracing::info!(
            groups = group_count,
            failed = failed_count,
            records = records.len(),
            "fetch barrier complete"
        );

        if records.is_empty() {
            self.state = PipelineState::Rendered;
            if failed_count == group_count {
                return Err(HexrichError::Unreachable(format!(
                    "all {} selected groups failed to fetch",
                    group_count
                )));
            }
            return Ok(PipelineOutcome::NoData);
        }

        let cells = hex::aggregate(&records, resolution);
        self.state = PipelineState::Rendered;

        if cells.is_empty() {
            // Every record carried unusable coordinates.
            return Ok(PipelineOutcome::NoData);
        }
        Ok(PipelineOutcome::Cells(cells))
    }
}
