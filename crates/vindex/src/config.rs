//! `index.toml` loading.
//!
//! The file lists which packages are served from which registry and tunes the
//! run. Package names must be unique across all `[[index]]` entries; the check
//! runs once, before any network access.

use crate::error::{IndexError, PackageConflict, Result};
use crate::render::INDEX_FILE;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml_edit::{DocumentMut, Item, Table};

/// Run settings from the `[settings]` table.
///
/// # Defaults
///
/// - `build_dir`: `build`
/// - `cache_dir`: same as `build_dir`
/// - `fallback_index`: `https://pypi.org/simple/`
/// - `jobs`: `4`
/// - `timeout`: 10 seconds
/// - `validate_remote_schema`: `true`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Public index scanned in addition to each package's registry.
    /// `None` disables the fallback.
    pub fallback_index: Option<String>,
    pub jobs: usize,
    pub timeout: Duration,
    pub validate_remote_schema: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            cache_dir: default_build_dir(),
            fallback_index: Some(default_fallback_index()),
            jobs: default_jobs(),
            timeout: default_timeout(),
            validate_remote_schema: true,
        }
    }
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_fallback_index() -> String {
    "https://pypi.org/simple/".to_string()
}

const fn default_jobs() -> usize {
    4
}

const fn default_timeout() -> Duration {
    vindex_core::DEFAULT_TIMEOUT
}

/// One `[[index]]` entry as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDeclaration {
    pub registry: String,
    pub packages: Vec<String>,
}

/// A package and the registry that is authoritative for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    pub name: String,
    pub registry: String,
}

/// Parsed and validated `index.toml`.
///
/// # Examples
///
/// ```
/// use vindex::config::IndexConfig;
///
/// let config = IndexConfig::from_toml(r#"
/// [settings]
/// jobs = 2
///
/// [[index]]
/// registry = "https://variants-index.example/simple/"
/// packages = ["torch", "numpy"]
/// "#).unwrap();
///
/// assert_eq!(config.settings.jobs, 2);
/// assert_eq!(config.packages[0].name, "numpy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub settings: Settings,
    /// Sorted by name.
    pub packages: Vec<PackageConfig>,
}

impl IndexConfig {
    /// Reads and parses the configuration file at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            IndexError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| IndexError::config(e.to_string()))?;

        let settings = match doc.get("settings") {
            Some(item) => {
                let table = item
                    .as_table()
                    .ok_or_else(|| IndexError::config("`settings` must be a table"))?;
                parse_settings(table)?
            }
            None => Settings::default(),
        };

        let declarations = parse_declarations(&doc)?;
        let packages = unique_packages(&declarations).map_err(IndexError::ConflictingPackages)?;

        Ok(Self { settings, packages })
    }
}

fn parse_settings(table: &Table) -> Result<Settings> {
    let mut settings = Settings::default();
    let mut cache_dir = None;

    for (key, item) in table.iter() {
        match key {
            "build-dir" => settings.build_dir = PathBuf::from(expect_str(key, item)?),
            "cache-dir" => cache_dir = Some(PathBuf::from(expect_str(key, item)?)),
            "fallback-index" => {
                let url = expect_str(key, item)?.trim();
                settings.fallback_index = (!url.is_empty()).then(|| url.to_string());
            }
            "jobs" => settings.jobs = expect_positive(key, item)?,
            "timeout-secs" => {
                settings.timeout = Duration::from_secs(expect_positive(key, item)? as u64);
            }
            "validate-remote-schema" => {
                settings.validate_remote_schema = item
                    .as_bool()
                    .ok_or_else(|| IndexError::config(format!("`{}` must be a boolean", key)))?;
            }
            _ => tracing::warn!("ignoring unknown setting `{}`", key),
        }
    }

    settings.cache_dir = cache_dir.unwrap_or_else(|| settings.build_dir.clone());
    Ok(settings)
}

fn expect_str<'a>(key: &str, item: &'a Item) -> Result<&'a str> {
    item.as_str()
        .ok_or_else(|| IndexError::config(format!("`{}` must be a string", key)))
}

fn expect_positive(key: &str, item: &Item) -> Result<usize> {
    item.as_integer()
        .and_then(|value| usize::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| IndexError::config(format!("`{}` must be a positive integer", key)))
}

fn parse_declarations(doc: &DocumentMut) -> Result<Vec<RegistryDeclaration>> {
    let Some(item) = doc.get("index") else {
        return Ok(Vec::new());
    };
    let entries = item
        .as_array_of_tables()
        .ok_or_else(|| IndexError::config("`index` must be an array of tables ([[index]])"))?;

    let mut declarations = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let registry = entry
            .get("registry")
            .and_then(Item::as_str)
            .map(str::trim)
            .filter(|registry| !registry.is_empty())
            .ok_or_else(|| {
                IndexError::config(format!("index entry #{} has no `registry`", position + 1))
            })?;

        let packages = entry
            .get("packages")
            .and_then(Item::as_array)
            .ok_or_else(|| {
                IndexError::config(format!("index `{}` has no `packages` array", registry))
            })?
            .iter()
            .map(|value| {
                let name = value.as_str().map(str::trim).unwrap_or_default();
                if is_valid_package_name(name) {
                    Ok(name.to_string())
                } else {
                    Err(IndexError::config(format!(
                        "index `{}` lists an invalid package name: {}",
                        registry, value
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        declarations.push(RegistryDeclaration {
            registry: registry.to_string(),
            packages,
        });
    }

    Ok(declarations)
}

/// Package names double as directory names, so only the PEP 508 name
/// alphabet is accepted, and a name may not shadow the global page.
fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && !name.eq_ignore_ascii_case(INDEX_FILE)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Normalizes a package name according to PEP 503.
pub fn canonical_name(name: &str) -> String {
    name.to_lowercase()
        .replace(&['_', '.'][..], "-")
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Assigns every declared package to its registry.
///
/// Returns all conflicts at once rather than the first one, so a broken
/// configuration can be fixed in one pass. Names are compared in their
/// PEP 503 normalized form.
pub fn unique_packages(
    declarations: &[RegistryDeclaration],
) -> std::result::Result<Vec<PackageConfig>, Vec<PackageConflict>> {
    let mut owners: HashMap<String, PackageConfig> = HashMap::new();
    let mut conflicts = Vec::new();

    for declaration in declarations {
        for name in &declaration.packages {
            let key = canonical_name(name);
            match owners.get(&key) {
                Some(owner) => conflicts.push(PackageConflict {
                    package: name.clone(),
                    first: owner.registry.clone(),
                    second: declaration.registry.clone(),
                }),
                None => {
                    owners.insert(
                        key,
                        PackageConfig {
                            name: name.clone(),
                            registry: declaration.registry.clone(),
                        },
                    );
                }
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    let mut packages: Vec<PackageConfig> = owners.into_values().collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_A: &str = "https://a.example/simple/";
    const REGISTRY_B: &str = "https://b.example/simple/";

    fn declaration(registry: &str, packages: &[&str]) -> RegistryDeclaration {
        RegistryDeclaration {
            registry: registry.to_string(),
            packages: packages.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_default_settings() {
        let config = IndexConfig::from_toml("").unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.settings.cache_dir, PathBuf::from("build"));
        assert_eq!(
            config.settings.fallback_index.as_deref(),
            Some("https://pypi.org/simple/")
        );
        assert_eq!(config.settings.timeout, Duration::from_secs(10));
        assert!(config.packages.is_empty());
    }

    #[test]
    fn test_full_settings() {
        let config = IndexConfig::from_toml(
            r#"
[settings]
build-dir = "public"
cache-dir = "cache"
fallback-index = "https://mirror.example/simple/"
jobs = 8
timeout-secs = 30
validate-remote-schema = false
"#,
        )
        .unwrap();

        let settings = config.settings;
        assert_eq!(settings.build_dir, PathBuf::from("public"));
        assert_eq!(settings.cache_dir, PathBuf::from("cache"));
        assert_eq!(
            settings.fallback_index.as_deref(),
            Some("https://mirror.example/simple/")
        );
        assert_eq!(settings.jobs, 8);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(!settings.validate_remote_schema);
    }

    #[test]
    fn test_cache_dir_follows_build_dir() {
        let config = IndexConfig::from_toml("[settings]\nbuild-dir = \"out\"\n").unwrap();
        assert_eq!(config.settings.cache_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_empty_fallback_disables_it() {
        let config = IndexConfig::from_toml("[settings]\nfallback-index = \"\"\n").unwrap();
        assert!(config.settings.fallback_index.is_none());
    }

    #[test]
    fn test_invalid_settings() {
        for content in [
            "[settings]\njobs = 0\n",
            "[settings]\njobs = \"four\"\n",
            "[settings]\ntimeout-secs = -1\n",
            "[settings]\nvalidate-remote-schema = \"yes\"\n",
            "[settings]\nbuild-dir = 3\n",
            "settings = 1\n",
        ] {
            let err = IndexConfig::from_toml(content).unwrap_err();
            assert!(matches!(err, IndexError::Config(_)), "{content}");
        }
    }

    #[test]
    fn test_invalid_toml() {
        let err = IndexConfig::from_toml("[[index]\nregistry =").unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }

    #[test]
    fn test_packages_sorted_by_name() {
        let config = IndexConfig::from_toml(&format!(
            r#"
[[index]]
registry = "{REGISTRY_A}"
packages = ["torch", "numpy"]

[[index]]
registry = "{REGISTRY_B}"
packages = ["dummy-project"]
"#
        ))
        .unwrap();

        let names: Vec<&str> = config.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["dummy-project", "numpy", "torch"]);
        assert_eq!(config.packages[0].registry, REGISTRY_B);
        assert_eq!(config.packages[1].registry, REGISTRY_A);
    }

    #[test]
    fn test_index_entry_requires_registry_and_packages() {
        let missing_registry = "[[index]]\npackages = [\"numpy\"]\n";
        assert!(matches!(
            IndexConfig::from_toml(missing_registry),
            Err(IndexError::Config(_))
        ));

        let missing_packages = format!("[[index]]\nregistry = \"{REGISTRY_A}\"\n");
        assert!(matches!(
            IndexConfig::from_toml(&missing_packages),
            Err(IndexError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_path_like_package_names() {
        for name in ["../etc", "a/b", "", "-leading", "index.json", "INDEX.JSON"] {
            let content =
                format!("[[index]]\nregistry = \"{REGISTRY_A}\"\npackages = [\"{name}\"]\n");
            assert!(
                matches!(IndexConfig::from_toml(&content), Err(IndexError::Config(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_package_is_fatal() {
        let err = IndexConfig::from_toml(&format!(
            r#"
[[index]]
registry = "{REGISTRY_A}"
packages = ["numpy"]

[[index]]
registry = "{REGISTRY_B}"
packages = ["numpy"]
"#
        ))
        .unwrap_err();

        match err {
            IndexError::ConflictingPackages(conflicts) => {
                assert_eq!(
                    conflicts,
                    vec![PackageConflict {
                        package: "numpy".into(),
                        first: REGISTRY_A.into(),
                        second: REGISTRY_B.into(),
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unique_packages_reports_every_conflict() {
        let conflicts = unique_packages(&[
            declaration(REGISTRY_A, &["numpy", "torch"]),
            declaration(REGISTRY_B, &["torch", "numpy", "scipy"]),
        ])
        .unwrap_err();

        let names: Vec<&str> = conflicts.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(names, vec!["torch", "numpy"]);
    }

    #[test]
    fn test_unique_packages_compares_normalized_names() {
        let conflicts = unique_packages(&[
            declaration(REGISTRY_A, &["Dummy_Project"]),
            declaration(REGISTRY_B, &["dummy-project"]),
        ])
        .unwrap_err();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, REGISTRY_A);
    }

    #[test]
    fn test_same_registry_listing_package_twice() {
        let conflicts = unique_packages(&[declaration(REGISTRY_A, &["numpy", "numpy"])]).unwrap_err();
        assert_eq!(conflicts[0].first, conflicts[0].second);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("requests"), "requests");
        assert_eq!(canonical_name("Django-REST-Framework"), "django-rest-framework");
        assert_eq!(canonical_name("my_._package"), "my-package");
        assert_eq!(canonical_name("zope.interface"), "zope-interface");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.toml");
        tokio::fs::write(
            &path,
            format!("[[index]]\nregistry = \"{REGISTRY_A}\"\npackages = [\"numpy\"]\n"),
        )
        .await
        .unwrap();

        let config = IndexConfig::load(&path).await.unwrap();
        assert_eq!(
            config.packages,
            vec![PackageConfig {
                name: "numpy".into(),
                registry: REGISTRY_A.into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexConfig::load(&dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }
}
