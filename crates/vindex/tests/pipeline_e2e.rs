//! End-to-end build against mock registries.

use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use vindex::config::IndexConfig;
use vindex::pipeline;
use vindex::render::JsonRenderer;
use vindex_core::{DEFAULT_TIMEOUT, HttpFetcher};

fn variant_document() -> Value {
    json!({
        "$schema": "https://variants-schema.wheelnext.dev/",
        "default-priorities": {
            "namespace": ["x86_64"],
            "feature": {"x86_64": ["level"]},
            "property": {"x86_64": {"level": ["v3", "v2", "v1"]}}
        },
        "providers": {
            "x86_64": {
                "plugin-api": "provider_variant_x86_64.plugin:X8664Plugin",
                "plugin-use": "all",
                "requires": ["provider-variant-x86-64 >=0.0.1"]
            }
        },
        "variants": {
            "x8664v3": {"x86_64": {"level": ["v3"]}},
            "x8664v1": {"x86_64": {"level": ["v1"]}}
        }
    })
}

fn anchor(href: &str, text: &str) -> String {
    format!("<a href=\"{href}\">{text}</a>\n")
}

fn config(registry: &str, fallback: &str, build_dir: &Path) -> IndexConfig {
    IndexConfig::from_toml(&format!(
        r#"
[settings]
build-dir = "{}"
fallback-index = "{fallback}"
validate-remote-schema = false
jobs = 2

[[index]]
registry = "{registry}"
packages = ["dummy-project"]
"#,
        build_dir.display()
    ))
    .unwrap()
}

async fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&tokio::fs::read(path).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_build_with_fallback_and_cache() {
    let mut registry = mockito::Server::new_async().await;
    let mut fallback = mockito::Server::new_async().await;

    let listing = [
        anchor(
            "/files/dummy_project-1.0.0-variants.json#sha256=0123abcd",
            "dummy_project-1.0.0-variants.json",
        ),
        anchor(
            "/files/dummy_project-1.0.0-py3-none-any-x8664v3.whl",
            "dummy_project-1.0.0-py3-none-any-x8664v3.whl",
        ),
        anchor(
            "/files/dummy_project-1.0.0-py3-none-any-x8664v1.whl",
            "dummy_project-1.0.0-py3-none-any-x8664v1.whl",
        ),
        anchor(
            "/files/dummy_project-1.0.0-py3-none-any.whl",
            "dummy_project-1.0.0-py3-none-any.whl",
        ),
        anchor(
            "/files/dummy_project-2.0.0-py3-none-any-x8664v3.whl",
            "dummy_project-2.0.0-py3-none-any-x8664v3.whl",
        ),
    ]
    .concat();

    let listing_mock = registry
        .mock("GET", "/simple/dummy-project/")
        .with_status(200)
        .with_body(format!("<html><body>{listing}</body></html>"))
        .expect(2)
        .create_async()
        .await;
    let document_mock = registry
        .mock("GET", "/files/dummy_project-1.0.0-variants.json")
        .with_status(200)
        .with_body(serde_json::to_vec(&variant_document()).unwrap())
        .expect(1)
        .create_async()
        .await;

    let fallback_listing = [
        anchor(
            "dummy_project-1.0.0-py3-none-any.whl",
            "dummy_project-1.0.0-py3-none-any.whl",
        ),
        anchor(
            "dummy_project-0.9.0-py3-none-any.whl",
            "dummy_project-0.9.0-py3-none-any.whl",
        ),
        anchor("dummy_project-0.9.0.tar.gz", "dummy_project-0.9.0.tar.gz"),
    ]
    .concat();
    fallback
        .mock("GET", "/simple/dummy-project/")
        .with_status(200)
        .with_body(fallback_listing)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let build_dir = dir.path().join("build");
    let config = config(
        &format!("{}/simple/", registry.url()),
        &format!("{}/simple/", fallback.url()),
        &build_dir,
    );
    let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT).unwrap());
    let renderer = JsonRenderer::new(&build_dir);

    let report = pipeline::run(&config, fetcher.clone(), &renderer)
        .await
        .unwrap();
    assert!(report.is_success());

    let cached_path = build_dir
        .join("dummy-project")
        .join("dummy_project-1.0.0-variants.json");
    let first_cache = tokio::fs::read(&cached_path).await.unwrap();
    let cached: Value = serde_json::from_slice(&first_cache).unwrap();
    assert_eq!(
        cached["$schema"],
        "https://variants-schema.wheelnext.dev/v0.0.3.json"
    );
    assert_eq!(cached["providers"]["x86_64"]["install-time"], true);
    assert_eq!(
        cached["static-properties"]["x86_64"]["level"],
        json!(["v3", "v2", "v1"])
    );

    let page = read_json(&build_dir.join("dummy-project").join("index.json")).await;
    let wheels: Vec<&str> = page["wheels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|wheel| wheel["name"].as_str().unwrap())
        .collect();
    // 2.0.0 has no variant document; 1.0.0 from the fallback is shadowed
    assert_eq!(
        wheels,
        vec![
            "dummy_project-1.0.0-py3-none-any-x8664v3.whl",
            "dummy_project-1.0.0-py3-none-any-x8664v1.whl",
            "dummy_project-1.0.0-py3-none-any.whl",
            "dummy_project-0.9.0-py3-none-any.whl",
        ]
    );
    assert_eq!(page["wheels"][0]["vprops"], json!(["x86_64 :: level :: v3"]));
    assert_eq!(page["wheels"][2]["vprops"], json!([]));
    assert!(
        page["wheels"][3]["link"]
            .as_str()
            .unwrap()
            .starts_with(&fallback.url())
    );

    let document = &page["variant_documents"][0];
    assert_eq!(document["version"], "1.0.0");
    assert_eq!(document["checksum"], "0123abcd");
    assert_eq!(document["cached_sha256"].as_str().unwrap().len(), 64);

    let global = read_json(&build_dir.join("index.json")).await;
    assert_eq!(global["packages"], json!(["dummy-project"]));

    // second run reads the document from the cache
    let report = pipeline::run(&config, fetcher, &renderer).await.unwrap();
    assert!(report.is_success());
    let second_cache = tokio::fs::read(&cached_path).await.unwrap();
    assert_eq!(first_cache, second_cache);

    listing_mock.assert_async().await;
    document_mock.assert_async().await;
}

#[tokio::test]
async fn test_failed_package_is_reported() {
    let mut registry = mockito::Server::new_async().await;
    registry
        .mock("GET", "/simple/dummy-project/")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(&format!("{}/simple/", registry.url()), "", dir.path());
    let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT).unwrap());
    let renderer = JsonRenderer::new(dir.path());

    let report = pipeline::run(&config, fetcher, &renderer).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures[0].package, "dummy-project");
    let global = read_json(&dir.path().join("index.json")).await;
    assert_eq!(global["packages"], json!([]));
}
