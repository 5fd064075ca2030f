//! Output writers.
//!
//! [`Renderer`] is the seam between the index data and its presentation. The
//! bundled [`JsonRenderer`] writes machine-readable `index.json` files that
//! an HTML front end (or a static file server) can consume as-is.

use crate::error::Result;
use crate::reconcile::PackageIndex;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// File name of every rendered page, at the build root and per package.
pub const INDEX_FILE: &str = "index.json";

/// Top-level listing of indexed packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalIndex {
    /// Sorted, without duplicates.
    pub packages: Vec<String>,
    pub build_date: String,
}

impl GlobalIndex {
    pub fn new(packages: impl IntoIterator<Item = String>, build_date: impl Into<String>) -> Self {
        let mut packages: Vec<String> = packages.into_iter().collect();
        packages.sort();
        packages.dedup();

        Self {
            packages,
            build_date: build_date.into(),
        }
    }
}

/// Current local time as shown on generated pages.
pub fn build_date() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M %:z").to_string()
}

/// Writes rendered pages.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Writes the page of a single package.
    async fn render_package(&self, index: &PackageIndex, build_date: &str) -> Result<()>;

    /// Writes the top-level page listing all packages.
    async fn render_global(&self, index: &GlobalIndex) -> Result<()>;
}

#[derive(Serialize)]
struct PackagePage<'a> {
    build_date: &'a str,
    #[serde(flatten)]
    index: &'a PackageIndex,
}

/// Renders `index.json` files into a build directory.
///
/// Layout:
///
/// ```text
/// <build-dir>/index.json
/// <build-dir>/<package>/index.json
/// ```
pub struct JsonRenderer {
    build_dir: PathBuf,
}

impl JsonRenderer {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }
}

async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

#[async_trait]
impl Renderer for JsonRenderer {
    async fn render_package(&self, index: &PackageIndex, build_date: &str) -> Result<()> {
        let path = self
            .build_dir
            .join(&index.project_name)
            .join(INDEX_FILE);
        write_json(&path, &PackagePage { build_date, index }).await
    }

    async fn render_global(&self, index: &GlobalIndex) -> Result<()> {
        write_json(&self.build_dir.join(INDEX_FILE), index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::WheelRecord;
    use serde_json::Value;

    fn package_index() -> PackageIndex {
        PackageIndex {
            project_name: "dummy-project".into(),
            variant_documents: Vec::new(),
            wheels: vec![WheelRecord {
                name: "dummy_project-1.0-py3-none-any.whl".into(),
                link: "https://files.example/dummy_project-1.0-py3-none-any.whl".into(),
                checksum: None,
                version: "1.0".into(),
                variant_label: None,
                vprops: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_global_index_sorted_and_deduplicated() {
        let index = GlobalIndex::new(
            ["torch", "numpy", "torch"].map(String::from),
            "2025-01-01 00:00 +00:00",
        );
        assert_eq!(index.packages, vec!["numpy", "torch"]);
    }

    #[test]
    fn test_build_date_format() {
        let date = build_date();
        // "YYYY-MM-DD HH:MM +HH:MM"
        assert_eq!(date.len(), 23);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[10..11], " ");
    }

    #[tokio::test]
    async fn test_render_package() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = JsonRenderer::new(dir.path());

        renderer
            .render_package(&package_index(), "2025-01-01 00:00 +00:00")
            .await
            .unwrap();

        let bytes = tokio::fs::read(dir.path().join("dummy-project").join("index.json"))
            .await
            .unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let page: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(page["project_name"], "dummy-project");
        assert_eq!(page["build_date"], "2025-01-01 00:00 +00:00");
        assert_eq!(page["wheels"][0]["version"], "1.0");
    }

    #[tokio::test]
    async fn test_render_global() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = JsonRenderer::new(dir.path().join("nested"));

        renderer
            .render_global(&GlobalIndex::new(
                vec!["numpy".to_string()],
                "2025-01-01 00:00 +00:00",
            ))
            .await
            .unwrap();

        let page: Value = serde_json::from_slice(
            &tokio::fs::read(dir.path().join("nested").join("index.json"))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(page["packages"], serde_json::json!(["numpy"]));
    }
}
