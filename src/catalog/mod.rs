//! Instrument channel catalog
//!
//! Holds the cytometer's channel definitions and matches channel
//! configurations (as reported for positive-control samples) against them
//! by spectral properties.

mod channel;
mod matcher;

pub use channel::{coerce_int, Channel, ChannelSpec, EmissionFilter};
pub use matcher::{CatalogError, CatalogResult, ChannelCatalog, MatchMode};
