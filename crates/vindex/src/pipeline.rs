//! Per-package build pipeline and worker pool.
//!
//! Each package is scanned, reconciled and rendered independently. Failures
//! abort only the package they occur in; the run collects them in a
//! [`BuildReport`] so the caller can decide on the exit status.

use crate::config::{IndexConfig, PackageConfig, Settings};
use crate::error::{IndexError, Result};
use crate::reconcile::{PackageIndex, reconcile};
use crate::render::{GlobalIndex, Renderer, build_date};
use crate::scanner::RegistryScanner;
use crate::store::VariantStore;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use vindex_core::Fetch;
use vindex_schema::Normalizer;

/// A package whose build failed.
#[derive(Debug)]
pub struct PackageFailure {
    pub package: String,
    pub error: IndexError,
}

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Sorted by package name.
    pub indexes: Vec<PackageIndex>,
    /// Packages without any servable wheel.
    pub empty: Vec<String>,
    pub failures: Vec<PackageFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds package indexes with bounded concurrency.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use vindex::config::IndexConfig;
/// use vindex::pipeline::IndexBuilder;
/// use vindex_core::HttpFetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IndexConfig::load(Path::new("index.toml")).await?;
/// let fetcher = Arc::new(HttpFetcher::new(config.settings.timeout)?);
/// let builder = IndexBuilder::new(fetcher, &config.settings);
///
/// let report = builder.build_all(&config.packages).await;
/// println!("{} packages indexed", report.indexes.len());
/// # Ok(())
/// # }
/// ```
pub struct IndexBuilder {
    scanner: RegistryScanner,
    store: VariantStore,
    jobs: usize,
}

impl IndexBuilder {
    pub fn new(fetcher: Arc<dyn Fetch>, settings: &Settings) -> Self {
        let normalizer = Arc::new(
            Normalizer::new(Arc::clone(&fetcher))
                .with_remote_validation(settings.validate_remote_schema),
        );

        Self {
            scanner: RegistryScanner::new(Arc::clone(&fetcher), settings.fallback_index.clone()),
            store: VariantStore::new(settings.cache_dir.clone(), fetcher, normalizer),
            jobs: settings.jobs.max(1),
        }
    }

    /// Scans and reconciles a single package.
    pub async fn build_package(&self, package: &PackageConfig) -> Result<Option<PackageIndex>> {
        tracing::info!("processing `{}` from {}", package.name, package.registry);

        let artifacts = self.scanner.scan_package(package).await?;
        let index = reconcile(&package.name, artifacts, &self.store).await?;

        if let Some(index) = &index {
            tracing::info!(
                "indexed `{}`: {} wheels, {} variant documents",
                package.name,
                index.wheels.len(),
                index.variant_documents.len()
            );
        }

        Ok(index)
    }

    /// Builds every package, at most `jobs` at a time.
    pub async fn build_all(&self, packages: &[PackageConfig]) -> BuildReport {
        let results: Vec<_> = stream::iter(packages)
            .map(|package| async move { (package, self.build_package(package).await) })
            .buffer_unordered(self.jobs)
            .collect()
            .await;

        let mut report = BuildReport::default();
        for (package, result) in results {
            match result {
                Ok(Some(index)) => report.indexes.push(index),
                Ok(None) => report.empty.push(package.name.clone()),
                Err(error) => {
                    tracing::error!("failed to build `{}`: {}", package.name, error);
                    report.failures.push(PackageFailure {
                        package: package.name.clone(),
                        error,
                    });
                }
            }
        }

        report.indexes.sort_by(|a, b| a.project_name.cmp(&b.project_name));
        report.empty.sort();
        report.failures.sort_by(|a, b| a.package.cmp(&b.package));
        report
    }
}

/// Builds every configured package and renders the results.
///
/// Rendering errors are fatal for the whole run; package build errors are
/// reported in the returned [`BuildReport`].
pub async fn run(
    config: &IndexConfig,
    fetcher: Arc<dyn Fetch>,
    renderer: &dyn Renderer,
) -> Result<BuildReport> {
    let builder = IndexBuilder::new(fetcher, &config.settings);
    let report = builder.build_all(&config.packages).await;

    let date = build_date();
    for index in &report.indexes {
        renderer.render_package(index, &date).await?;
    }

    let global = GlobalIndex::new(
        report.indexes.iter().map(|index| index.project_name.clone()),
        date,
    );
    renderer.render_global(&global).await?;

    tracing::info!(
        "built {} package indexes ({} empty, {} failed)",
        report.indexes.len(),
        report.empty.len(),
        report.failures.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use vindex_core::CoreError;

    /// Serves fixed bodies by URL.
    struct PageFetcher {
        pages: HashMap<String, String>,
    }

    impl PageFetcher {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| ((*url).to_string(), (*body).to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl Fetch for PageFetcher {
        async fn get(&self, url: &str) -> vindex_core::Result<Bytes> {
            self.pages
                .get(url)
                .map(|body| Bytes::from(body.clone()))
                .ok_or_else(|| CoreError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        packages: Mutex<Vec<String>>,
        global: Mutex<Option<GlobalIndex>>,
    }

    #[async_trait]
    impl Renderer for RecordingRenderer {
        async fn render_package(&self, index: &PackageIndex, _build_date: &str) -> Result<()> {
            self.packages.lock().unwrap().push(index.project_name.clone());
            Ok(())
        }

        async fn render_global(&self, index: &GlobalIndex) -> Result<()> {
            *self.global.lock().unwrap() = Some(index.clone());
            Ok(())
        }
    }

    fn settings(cache_dir: &Path) -> Settings {
        Settings {
            cache_dir: cache_dir.to_path_buf(),
            build_dir: cache_dir.to_path_buf(),
            fallback_index: None,
            jobs: 2,
            validate_remote_schema: false,
            ..Settings::default()
        }
    }

    fn package(name: &str) -> PackageConfig {
        PackageConfig {
            name: name.into(),
            registry: "https://index.example/simple/".into(),
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_packages() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = PageFetcher::new(&[
            (
                "https://index.example/simple/good/",
                r#"<a href="good-1.0-py3-none-any.whl">good-1.0-py3-none-any.whl</a>"#,
            ),
            (
                "https://index.example/simple/bad/",
                r#"<a href="bad-1.0.whl">bad-1.0.whl</a>"#,
            ),
            (
                "https://index.example/simple/empty/",
                r#"<a href="empty-1.0-py3-none-any-abc.whl">empty-1.0-py3-none-any-abc.whl</a>"#,
            ),
        ]);
        let builder = IndexBuilder::new(fetcher, &settings(dir.path()));

        let report = builder
            .build_all(&[
                package("bad"),
                package("empty"),
                package("good"),
                package("missing"),
            ])
            .await;

        assert!(!report.is_success());
        assert_eq!(report.indexes.len(), 1);
        assert_eq!(report.indexes[0].project_name, "good");
        assert_eq!(report.empty, vec!["empty"]);

        let failed: Vec<&str> = report.failures.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(failed, vec!["bad", "missing"]);
        assert!(matches!(
            report.failures[0].error,
            IndexError::Artifact { .. }
        ));
        assert!(matches!(
            report.failures[1].error,
            IndexError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_renders_indexed_packages() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = PageFetcher::new(&[
            (
                "https://index.example/simple/torch/",
                r#"<a href="torch-2.0-py3-none-any.whl">torch-2.0-py3-none-any.whl</a>"#,
            ),
            (
                "https://index.example/simple/numpy/",
                r#"<a href="numpy-2.0-py3-none-any.whl">numpy-2.0-py3-none-any.whl</a>"#,
            ),
        ]);
        let config = IndexConfig {
            settings: settings(dir.path()),
            packages: vec![package("numpy"), package("torch"), package("absent")],
        };
        let renderer = RecordingRenderer::default();

        let report = run(&config, fetcher, &renderer).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        let mut rendered = renderer.packages.lock().unwrap().clone();
        rendered.sort();
        assert_eq!(rendered, vec!["numpy", "torch"]);

        let global = renderer.global.lock().unwrap().clone().unwrap();
        assert_eq!(global.packages, vec!["numpy", "torch"]);
    }
}
