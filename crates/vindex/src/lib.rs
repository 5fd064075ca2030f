//! Static index builder for variant-aware wheel registries.
//!
//! For every configured package, `vindex` scans the authoritative registry
//! (and a public fallback index), loads and normalizes the package's variant
//! documents, and joins each variant wheel with the properties its label
//! stands for. The result is one render-ready [`PackageIndex`] per package
//! plus a top-level [`GlobalIndex`].
//!
//! # Architecture
//!
//! - **Config**: `index.toml` loading and the package uniqueness check
//! - **Scanner**: PEP 503 listing pages → classified artifacts
//! - **Store**: read-through disk cache of normalized variant documents
//! - **Reconcile**: wheels × variant documents → [`PackageIndex`]
//! - **Pipeline**: bounded worker pool over packages
//! - **Render**: [`Renderer`] trait and the bundled JSON renderer

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use config::{IndexConfig, PackageConfig, Settings};
pub use error::{IndexError, PackageConflict, Result};
pub use pipeline::{BuildReport, IndexBuilder, PackageFailure, run};
pub use reconcile::{PackageIndex, VariantDocumentSummary, WheelRecord, reconcile};
pub use render::{GlobalIndex, JsonRenderer, Renderer};
pub use scanner::RegistryScanner;
pub use store::{StoredDocument, VariantStore};
