//! # Tally Common Library
//!
//! Shared code for the Tally cost-breakdown tools including:
//! - Monetary amounts in integer cents
//! - The CSI MasterFormat division taxonomy (current and obsolete codes)
//! - Configuration loading (TOML, thresholds, keyword families)
//! - Common error types

pub mod config;
pub mod error;
pub mod money;
pub mod taxonomy;

pub use error::{Error, Result};
pub use money::Money;
pub use taxonomy::Taxonomy;
