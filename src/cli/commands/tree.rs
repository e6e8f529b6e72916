use crate::config::Config;
use crate::gbif::GbifClient;
use crate::taxonomy::client::TaxonClient;
use crate::taxonomy::tree::{TreeBuilder, TreeNode};
use anyhow::Result;
use clap::Args;
use colored::*;
use std::sync::Arc;

#[derive(Args)]
pub struct TreeArgs {
    /// Root taxon name to expand (e.g. "Animalia")
    pub root: String,

    /// How many rank levels to expand below the root
    #[arg(short, long, default_value_t = 2)]
    pub depth: usize,
}

pub async fn run(args: TreeArgs, config: &Config) -> Result<()> {
    let provider = Arc::new(GbifClient::new(&config.taxonomy)?);
    let client = Arc::new(TaxonClient::new(provider, config.taxonomy.children_limit));
    let builder = TreeBuilder::new(client);

    let Some(root) = builder.expand_root(&args.root).await? else {
        println!("{} no taxon matches '{}'", "Not found:".yellow().bold(), args.root);
        return Ok(());
    };

    let tree = builder.expand_to_depth(&root.taxon, args.depth).await;
    print_node(&tree, 0);
    println!(
        "\n{} nodes, {} selectable families",
        tree.size(),
        tree.family_ids().len()
    );
    Ok(())
}

fn print_node(node: &TreeNode, indent: usize) {
    let label = node.taxon.label();
    let line = if node.taxon.rank.is_terminal() {
        format!("{} [{}]", label.green(), node.taxon.id)
    } else {
        format!("{} ({})", label.bold(), node.taxon.rank)
    };
    println!("{}{}", "  ".repeat(indent), line);
    for child in &node.children {
        print_node(child, indent + 1);
    }
}
