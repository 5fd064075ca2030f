//! Core abstractions for vindex.
//!
//! This crate provides the leaf building blocks shared by the schema crate and
//! the index builder:
//!
//! - **Fetch primitive**: the [`Fetch`] trait and its `reqwest`-backed
//!   [`HttpFetcher`]
//! - **Filename parsing**: wheel and variant-document filename grammars
//! - **Artifacts**: typed records for files found on registry pages
//! - **Error Types**: [`CoreError`] and the crate-wide [`Result`] alias
//!
//! # Examples
//!
//! ```
//! use vindex_core::{Artifact, ClassifiedArtifact};
//!
//! let artifact = Artifact {
//!     name: "numpy-2.1.0-cp312-cp312-linux_x86_64-x8664v3.whl".into(),
//!     link: "https://example.com/numpy-2.1.0-cp312-cp312-linux_x86_64-x8664v3.whl".into(),
//!     checksum: None,
//! };
//!
//! let classified = ClassifiedArtifact::classify(artifact).unwrap();
//! assert_eq!(classified.version(), "2.1.0");
//! ```

pub mod artifact;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod version;

// Re-export commonly used types
pub use artifact::{Artifact, Checksum, ClassifiedArtifact, VariantDocumentArtifact, WheelArtifact};
pub use error::{CoreError, Result};
pub use fetch::{DEFAULT_TIMEOUT, Fetch, HttpFetcher, join_url};
pub use filename::{ParsedFilename, VariantDocumentName, WheelFilename, parse_filename};
pub use version::{compare_versions, parse_version};
