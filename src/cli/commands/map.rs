use crate::config::Config;
use crate::gbif::GbifClient;
use crate::hex::HexCell;
use crate::occurrence::OccurrenceFetcher;
use crate::pipeline::{Pipeline, PipelineOutcome, SelectionSet};
use crate::taxonomy::client::{TaxonClient, TaxonomyProvider};
use crate::taxonomy::{Rank, TaxonId};
use anyhow::{bail, Result};
use clap::Args;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};
use std::sync::Arc;

#[derive(Args)]
pub struct MapArgs {
    /// Family names to select (resolved against the taxonomy service)
    #[arg(required_unless_present = "family_ids")]
    pub families: Vec<String>,

    /// Family ids to select (validated against the taxonomy service)
    #[arg(long, value_delimiter = ',')]
    pub family_ids: Vec<u64>,

    /// Hex grid resolution (overrides the configured value)
    #[arg(short, long)]
    pub resolution: Option<u8>,

    /// Emit the cell table as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: MapArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(resolution) = args.resolution {
        config.grid.resolution = resolution;
    }
    let resolution = config.resolution()?;

    let gbif = Arc::new(GbifClient::new(&config.taxonomy)?);
    let client = TaxonClient::new(Arc::clone(&gbif), config.taxonomy.children_limit);

    let selection = build_selection(&client, &args.families, &args.family_ids).await?;

    tracing::info!(families = selection.len(), %resolution, "running pipeline");

    let fetcher = OccurrenceFetcher::new(
        gbif,
        config.fetch_limits(),
        config.occurrence.parallel_fetches,
    );
    let mut pipeline = Pipeline::new(fetcher);

    match pipeline.run(&selection, resolution).await? {
        PipelineOutcome::NoData => {
            println!("{}", "No occurrence data with coordinates found.".yellow());
        }
        PipelineOutcome::Cells(cells) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
            } else {
                print_cells(&cells);
            }
        }
    }
    Ok(())
}

/// Resolve names and validate raw ids into a family-only selection.
/// Every id goes through the taxonomy service; anything that is not a
/// family is refused, same as the name path.
async fn build_selection<P: TaxonomyProvider>(
    client: &TaxonClient<P>,
    families: &[String],
    family_ids: &[TaxonId],
) -> Result<SelectionSet> {
    let mut selection = SelectionSet::new();

    for &id in family_ids {
        match client.fetch_by_id(id).await? {
            Some(taxon) if taxon.rank == Rank::Family => {
                selection.select(&taxon);
            }
            Some(taxon) => bail!(
                "id {} is {} at rank {}, not a family",
                id,
                taxon.scientific_name,
                taxon.rank
            ),
            None => bail!("no taxon with id {}", id),
        }
    }

    for name in families {
        match client.resolve_by_name(name).await? {
            Some(taxon) if taxon.rank == Rank::Family => {
                selection.select(&taxon);
            }
            Some(taxon) => bail!(
                "'{}' resolved to {} at rank {}, not a family",
                name,
                taxon.scientific_name,
                taxon.rank
            ),
            None => bail!("no taxon matches '{}'", name),
        }
    }

    Ok(selection)
}

fn print_cells(cells: &[HexCell]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Cell", "Lat", "Lon", "Richness", "Species"]);
    for cell in cells {
        table.add_row(vec![
            cell.cell.to_string(),
            format!("{:.4}", cell.centroid_lat),
            format!("{:.4}", cell.centroid_lon),
            cell.richness.to_string(),
            preview(&cell.sample_labels, 60),
        ]);
    }
    println!("{table}");
    println!("{} populated cells", cells.len());
}

fn preview(labels: &str, max: usize) -> String {
    if labels.len() <= max {
        return labels.to_string();
    }
    let mut end = max;
    while !labels.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &labels[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Taxon;
    use async_trait::async_trait;

    /// Provider knowing one family (5362) and one class (212).
    struct TwoTaxaProvider;

    #[async_trait]
    impl TaxonomyProvider for TwoTaxaProvider {
        async fn match_name(&self, name: &str) -> crate::Result<Option<Taxon>> {
            Ok(match name {
                "Corvidae" => Some(Taxon {
                    id: 5362,
                    scientific_name: "Corvidae".to_string(),
                    common_name: None,
                    rank: Rank::Family,
                }),
                _ => None,
            })
        }

        async fn taxon_detail(&self, id: crate::taxonomy::TaxonId) -> crate::Result<Option<Taxon>> {
            Ok(match id {
                5362 => Some(Taxon {
                    id: 5362,
                    scientific_name: "Corvidae".to_string(),
                    common_name: None,
                    rank: Rank::Family,
                }),
                212 => Some(Taxon {
                    id: 212,
                    scientific_name: "Aves".to_string(),
                    common_name: Some("Birds".to_string()),
                    rank: Rank::Class,
                }),
                _ => None,
            })
        }

        async fn children(
            &self,
            _id: crate::taxonomy::TaxonId,
            _limit: usize,
        ) -> crate::Result<Vec<Taxon>> {
            Ok(Vec::new())
        }
    }

    fn client() -> TaxonClient<TwoTaxaProvider> {
        TaxonClient::new(Arc::new(TwoTaxaProvider), 1000)
    }

    #[tokio::test]
    async fn family_ids_are_validated_before_selection() {
        let selection = build_selection(&client(), &[], &[5362]).await.unwrap();
        assert_eq!(selection.ids(), vec![5362]);
    }

    #[tokio::test]
    async fn non_family_id_is_refused() {
        let err = build_selection(&client(), &[], &[212]).await.unwrap_err();
        assert!(err.to_string().contains("not a family"));
    }

    #[tokio::test]
    async fn unknown_id_is_refused() {
        let err = build_selection(&client(), &[], &[999]).await.unwrap_err();
        assert!(err.to_string().contains("no taxon with id 999"));
    }

    #[tokio::test]
    async fn names_and_ids_share_the_same_rank_gate() {
        let selection = build_selection(&client(), &["Corvidae".to_string()], &[5362])
            .await
            .unwrap();
        // Name and id resolve to the same family; the set deduplicates.
        assert_eq!(selection.ids(), vec![5362]);
    }
}
