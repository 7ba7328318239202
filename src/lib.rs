//! Crash-test channel collections with on-demand channel resolution.
//!
//! An [`Isomme`] holds the channels of one test. [`Isomme::get_channel`]
//! returns a channel for a code pattern: found as recorded, filtered from a
//! less filtered recording, calculated from other channels (HIC, BrIC,
//! resultants, neck moments, ...) or obtained by differentiation or
//! integration.

pub mod calculate;
pub mod config;
pub mod data;
pub mod error;
pub mod isomme;
pub mod rules;

pub use config::{FilterMethod, ResolveOptions, ResolverConfig};
pub use data::channel::{create_sample, Channel, SampleMode};
pub use data::code::{Code, CodeField};
pub use data::codebook::Codebook;
pub use data::info::{Info, MetadataValue};
pub use data::unit::Unit;
pub use error::{Error, Result};
pub use isomme::Isomme;
