/// Deterministic reduction of occurrence records into hex bins
use crate::occurrence::OccurrenceRecord;
use h3o::{CellIndex, LatLng, Resolution};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Character budget for the cosmetic species preview on a cell.
pub const SAMPLE_LABEL_BUDGET: usize = 500;

/// One populated cell of the hex grid.
///
/// `richness` counts distinct species (distinct coordinate pairs when the
/// species is unknown), never raw records. `sample_labels` is a bounded
/// preview for display and carries no authority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HexCell {
    pub cell: CellIndex,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub richness: usize,
    pub sample_labels: String,
}

/// Reduce records into hex cells at the given resolution. Pure: no I/O,
/// and identical inputs produce identical output, row order included
/// (rows are sorted by cell index).
///
/// Records with non-finite or out-of-range coordinates are dropped.
pub fn aggregate(records: &[OccurrenceRecord], resolution: Resolution) -> Vec<HexCell> {
    aggregate_with_budget(records, resolution, SAMPLE_LABEL_BUDGET)
}

pub fn aggregate_with_budget(
    records: &[OccurrenceRecord],
    resolution: Resolution,
    label_budget: usize,
) -> Vec<HexCell> {
    let mut bins: BTreeMap<CellIndex, BTreeSet<String>> = BTreeMap::new();

    for record in records {
        if !record.latitude.is_finite() || !record.longitude.is_finite() {
            continue;
        }
        let Ok(coord) = LatLng::new(record.latitude, record.longitude) else {
            continue;
        };
        let cell = coord.to_cell(resolution);
        let label = match &record.species {
            Some(species) => species.clone(),
            // Distinct coordinate pairs stand in for unknown species.
            None => format!("{:.5},{:.5}", record.latitude, record.longitude),
        };
        bins.entry(cell).or_default().insert(label);
    }

    bins.into_iter()
        .map(|(cell, species)| {
            let centroid = LatLng::from(cell);
            HexCell {
                cell,
                centroid_lat: centroid.lat(),
                centroid_lon: centroid.lng(),
                richness: species.len(),
                sample_labels: join_truncated(&species, label_budget),
            }
        })
        .collect()
}

/// Sorted, comma-joined labels cut at a char boundary within the budget.
fn join_truncated(labels: &BTreeSet<String>, budget: usize) -> String {
    let mut joined = labels.iter().cloned().collect::<Vec<_>>().join(", ");
    if joined.len() > budget {
        let mut end = budget;
        while !joined.is_char_boundary(end) {
            end -= 1;
        }
        joined.truncate(end);
    }
    joined
}
