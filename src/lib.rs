pub mod cli;
pub mod config;
pub mod gbif;
pub mod hex;
pub mod occurrence;
pub mod pipeline;
pub mod taxonomy;

pub use crate::hex::{aggregate, HexCell};
pub use crate::pipeline::{Pipeline, PipelineOutcome, SelectionSet};
pub use crate::taxonomy::{Rank, Taxon, TaxonId};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HexrichError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Occurrence error: {0}")]
    Occurrence(String),

    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HexrichError>;
