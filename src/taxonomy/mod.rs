/// Taxonomic ranks and resolved taxa for hierarchy browsing
pub mod cache;
pub mod client;
pub mod tree;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a taxon (GBIF usage key domain).
pub type TaxonId = u64;

/// The fixed rank ladder browsed by the tree, kingdom down to family.
///
/// Family is the terminal rank: families are the unit of occurrence
/// selection and have no next rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
}

impl Rank {
    /// The full ladder in descending order.
    pub const SEQUENCE: [Rank; 5] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
    ];

    /// Parse rank from an upstream rank string. Ranks outside the
    /// ladder (GENUS, SPECIES, unranked, ...) yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KINGDOM" => Some(Self::Kingdom),
            "PHYLUM" => Some(Self::Phylum),
            "CLASS" => Some(Self::Class),
            "ORDER" => Some(Self::Order),
            "FAMILY" => Some(Self::Family),
            _ => None,
        }
    }

    /// Position in the ladder (0 = kingdom).
    pub fn depth(self) -> usize {
        match self {
            Self::Kingdom => 0,
            Self::Phylum => 1,
            Self::Class => 2,
            Self::Order => 3,
            Self::Family => 4,
        }
    }

    /// The rank expected of this rank's children, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Kingdom => Some(Self::Phylum),
            Self::Phylum => Some(Self::Class),
            Self::Class => Some(Self::Order),
            Self::Order => Some(Self::Family),
            Self::Family => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Kingdom => "KINGDOM",
            Self::Phylum => "PHYLUM",
            Self::Class => "CLASS",
            Self::Order => "ORDER",
            Self::Family => "FAMILY",
        };
        write!(f, "{}", s)
    }
}

/// A resolved node of the classification hierarchy.
///
/// Immutable once resolved; owned by the resolution cache and cloned
/// into the tree, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: TaxonId,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub rank: Rank,
}

impl Taxon {
    /// Display label, "Scientific (common)" when a vernacular name is known.
    pub fn label(&self) -> String {
        match &self.common_name {
            Some(common) => format!("{} ({})", self.scientific_name, common),
            None => self.scientific_name.clone(),
        }
    }
}
