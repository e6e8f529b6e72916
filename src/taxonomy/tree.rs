/// Rank-bounded lazy expansion of the classification tree
use super::client::{TaxonClient, TaxonomyProvider};
use super::{Taxon, TaxonId};
use crate::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

/// A taxon plus its expanded children. Children are populated only when
/// the caller actually expands the subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub taxon: Taxon,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(taxon: Taxon) -> Self {
        Self {
            taxon,
            children: Vec::new(),
        }
    }

    /// Total node count including this node.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Ids of all FAMILY-rank descendants (selection candidates).
    pub fn family_ids(&self) -> Vec<TaxonId> {
        let mut out = Vec::new();
        self.collect_family_ids(&mut out);
        out
    }

    fn collect_family_ids(&self, out: &mut Vec<TaxonId>) {
        if self.taxon.rank.is_terminal() {
            out.push(self.taxon.id);
        }
        for child in &self.children {
            child.collect_family_ids(out);
        }
    }
}

/// Expands taxa one rank level at a time through a cached client.
///
/// Depth is bounded by position in the fixed rank ladder, not by a
/// visited-set: even a child that points back at an ancestor carries some
/// rank, and the ladder admits no path longer than kingdom to family.
pub struct TreeBuilder<P> {
    client: Arc<TaxonClient<P>>,
}

impl<P: TaxonomyProvider> TreeBuilder<P> {
    pub fn new(client: Arc<TaxonClient<P>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TaxonClient<P> {
        &self.client
    }

    /// Resolve a root name into an unexpanded node.
    pub async fn expand_root(&self, name: &str) -> Result<Option<TreeNode>> {
        Ok(self.client.resolve_by_name(name).await?.map(TreeNode::leaf))
    }

    /// One level of expansion: the children of `taxon` at exactly its next
    /// rank. A terminal taxon expands to nothing. Children at any other
    /// rank are dropped, and a provider failure is absorbed as absence so
    /// browsing stays responsive.
    pub async fn expand(&self, taxon: &Taxon) -> Vec<TreeNode> {
        let Some(expected) = taxon.rank.next() else {
            return Vec::new();
        };

        let children = match self.client.children(taxon.id).await {
            Ok(children) => children,
            Err(err) => {
                tracing::warn!(id = taxon.id, %err, "child expansion failed; omitting subtree");
                return Vec::new();
            }
        };

        children
            .into_iter()
            .filter(|child| child.rank == expected)
            .map(TreeNode::leaf)
            .collect()
    }

    /// Expand `taxon` recursively down to `budget` further levels.
    ///
    /// The effective depth is the smaller of `budget` and the remaining
    /// rank ladder, so no budget value can recurse past FAMILY.
    pub fn expand_to_depth<'a>(
        &'a self,
        taxon: &'a Taxon,
        budget: usize,
    ) -> BoxFuture<'a, TreeNode> {
        async move {
            let mut node = TreeNode::leaf(taxon.clone());
            if budget == 0 || taxon.rank.is_terminal() {
                return node;
            }
            for child in self.expand(taxon).await {
                node.children
                    .push(self.expand_to_depth(&child.taxon, budget - 1).await);
            }
            node
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::client::TaxonomyProvider;
    use crate::taxonomy::Rank;
    use crate::HexrichError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn taxon(id: TaxonId, name: &str, rank: Rank) -> Taxon {
        Taxon {
            id,
            scientific_name: name.to_string(),
            common_name: None,
            rank,
        }
    }

    /// Provider serving a fixed child table; unknown ids fail transport.
    struct TableProvider {
        children: HashMap<TaxonId, Vec<Taxon>>,
        fail_ids: Vec<TaxonId>,
    }

    #[async_trait]
    impl TaxonomyProvider for TableProvider {
        async fn match_name(&self, name: &str) -> Result<Option<Taxon>> {
            Ok(match name {
                "Animalia" => Some(taxon(1, "Animalia", Rank::Kingdom)),
                _ => None,
            })
        }

        async fn taxon_detail(&self, _id: TaxonId) -> Result<Option<Taxon>> {
            Ok(None)
        }

        async fn children(&self, id: TaxonId, _limit: usize) -> Result<Vec<Taxon>> {
            if self.fail_ids.contains(&id) {
                return Err(HexrichError::Resolution("unreachable".to_string()));
            }
            Ok(self.children.get(&id).cloned().unwrap_or_default())
        }
    }

    fn builder(provider: TableProvider) -> TreeBuilder<TableProvider> {
        TreeBuilder::new(Arc::new(TaxonClient::new(Arc::new(provider), 1000)))
    }

    #[tokio::test]
    async fn expand_keeps_only_next_rank_children() {
        let mut children = HashMap::new();
        children.insert(
            1,
            vec![
                taxon(52, "Chordata", Rank::Phylum),
                // Malformed upstream data: a class and an echo of the root
                // mixed into a kingdom's children.
                taxon(212, "Aves", Rank::Class),
                taxon(1, "Animalia", Rank::Kingdom),
            ],
        );
        let builder = builder(TableProvider {
            children,
            fail_ids: vec![],
        });

        let root = taxon(1, "Animalia", Rank::Kingdom);
        let expanded = builder.expand(&root).await;
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].taxon.scientific_name, "Chordata");
        assert_eq!(expanded[0].taxon.rank, Rank::Phylum);
    }

    #[tokio::test]
    async fn family_never_expands() {
        let mut children = HashMap::new();
        // Even if upstream claims a family has family children.
        children.insert(100, vec![taxon(101, "Bogusidae", Rank::Family)]);
        let builder = builder(TableProvider {
            children,
            fail_ids: vec![],
        });

        let family = taxon(100, "Corvidae", Rank::Family);
        assert!(builder.expand(&family).await.is_empty());
    }

    #[tokio::test]
    async fn ancestor_echo_cannot_recurse_unboundedly() {
        let mut children = HashMap::new();
        // Adversarial: every node lists a child one rank down that shares
        // id 1, and id 1's listing echoes itself at every rank.
        children.insert(
            1,
            vec![
                taxon(1, "Loopia", Rank::Phylum),
                taxon(1, "Loopia", Rank::Class),
                taxon(1, "Loopia", Rank::Order),
                taxon(1, "Loopia", Rank::Family),
                taxon(1, "Loopia", Rank::Kingdom),
            ],
        );
        let builder = builder(TableProvider {
            children,
            fail_ids: vec![],
        });

        let root = taxon(1, "Loopia", Rank::Kingdom);
        let tree = builder.expand_to_depth(&root, usize::MAX).await;

        // KINGDOM -> PHYLUM -> CLASS -> ORDER -> FAMILY: five levels, done.
        let mut depth = 0;
        let mut node = &tree;
        while let Some(child) = node.children.first() {
            assert_eq!(child.taxon.rank.depth(), node.taxon.rank.depth() + 1);
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 4);
        assert_eq!(node.taxon.rank, Rank::Family);
    }

    #[tokio::test]
    async fn failed_subtree_is_omitted_not_fatal() {
        let mut children = HashMap::new();
        children.insert(
            1,
            vec![
                taxon(52, "Chordata", Rank::Phylum),
                taxon(54, "Arthropoda", Rank::Phylum),
            ],
        );
        // Chordata's own expansion fails at the transport level.
        let builder = builder(TableProvider {
            children,
            fail_ids: vec![52],
        });

        let root = taxon(1, "Animalia", Rank::Kingdom);
        let tree = builder.expand_to_depth(&root, 2).await;
        assert_eq!(tree.children.len(), 2);
        // Children come back sorted by name, so Chordata is second.
        let chordata = &tree.children[1];
        assert_eq!(chordata.taxon.scientific_name, "Chordata");
        assert!(chordata.children.is_empty());
    }

    #[tokio::test]
    async fn family_ids_collects_terminal_descendants() {
        let mut children = HashMap::new();
        children.insert(1, vec![taxon(10, "Passeriformes", Rank::Order)]);
        children.insert(
            10,
            vec![
                taxon(11, "Corvidae", Rank::Family),
                taxon(12, "Paridae", Rank::Family),
            ],
        );
        let builder = builder(TableProvider {
            children,
            fail_ids: vec![],
        });

        let root = taxon(1, "Aves", Rank::Class);
        let tree = builder.expand_to_depth(&root, 3).await;
        assert_eq!(tree.family_ids(), vec![11, 12]);
        assert_eq!(tree.size(), 4);
    }
}
