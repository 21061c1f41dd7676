use htmlpack::core::models::{DuplicatePolicy, PipelineConfig};
use htmlpack::core::services::AssetPipeline;
use htmlpack::infrastructure::{OxcBundleEngine, TokioFileSystemService};
use htmlpack::utils::PackError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site")
}

fn pipeline(config: PipelineConfig) -> AssetPipeline {
    AssetPipeline::new(
        Arc::new(TokioFileSystemService),
        Arc::new(OxcBundleEngine::new()),
        config,
    )
}

fn fixture_config(outdir: &Path) -> PipelineConfig {
    PipelineConfig {
        input_file: fixture_root().join("index.html"),
        output_directory: outdir.to_path_buf(),
        project_root: fixture_root(),
        ..Default::default()
    }
}

/// Copy the fixture site so a test can modify it
fn copy_fixture(to: &Path) {
    fn copy_dir(from: &Path, to: &Path) {
        fs::create_dir_all(to).unwrap();
        for entry in fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            let target = to.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                fs::copy(entry.path(), target).unwrap();
            }
        }
    }
    copy_dir(&fixture_root(), to);
}

#[tokio::test]
async fn test_fixture_site_build() {
    let out = tempfile::tempdir().unwrap();
    let outdir = out.path().join("dist");

    let report = pipeline(fixture_config(&outdir)).run().await.unwrap();

    assert_eq!(report.output_file, outdir.join("index.html"));
    let html = fs::read_to_string(&report.output_file).unwrap();

    // references point at the outputs, everything else is untouched
    assert!(html.contains(r#"<link rel="stylesheet" href="site.css" media="all">"#));
    assert!(html.contains(r#"<script type="module" src="main.js" defer="">"#));
    assert!(html.contains(r#"<img class="logo" alt="Logo" src="logo.svg" width="32">"#));
    assert!(html.contains(r#"<link rel="preconnect" href="https://fonts.example.com">"#));
    assert!(html.contains(r#"<a href="/about.html">About</a>"#));
    assert!(html.contains("<title>Fixture site</title>"));

    let js = fs::read_to_string(outdir.join("main.js")).unwrap();
    assert!(js.contains("Hello, "));
    assert!(js.contains("dark"));
    assert!(!js.contains("import {"));

    let css = fs::read_to_string(outdir.join("site.css")).unwrap();
    assert!(css.contains("body{"));
    assert!(css.contains("color:red"));
    assert!(!css.contains("@import"));

    assert!(outdir.join("logo.svg").exists());

    let root = fixture_root().canonicalize().unwrap();
    for watched in [
        "src/main.js",
        "lib/util.js",
        "src/worker.js",
        "assets/logo.svg",
        "styles/site.css",
        "styles/base.css",
    ] {
        assert!(report.watch_files.contains(&root.join(watched)), "{} should be watched", watched);
    }

    let references: Vec<&str> = report.assets.iter().map(|asset| asset.reference.as_str()).collect();
    assert_eq!(references, vec!["/styles/site.css", "/src/main.js", "/assets/logo.svg"]);
}

#[tokio::test]
async fn test_anchors_and_public_path() {
    let site = tempfile::tempdir().unwrap();
    copy_fixture(site.path());
    fs::write(site.path().join("about.html"), "<p>About</p>").unwrap();

    let config = PipelineConfig {
        input_file: site.path().join("index.html"),
        output_directory: PathBuf::from("public"),
        project_root: site.path().to_path_buf(),
        include_anchors: true,
        public_path: Some("/static/".to_string()),
        ..Default::default()
    };

    let report = pipeline(config).run().await.unwrap();

    let outdir = site.path().canonicalize().unwrap().join("public");
    assert_eq!(report.output_file, outdir.join("index.html"));
    let html = fs::read_to_string(&report.output_file).unwrap();
    assert!(html.contains(r#"src="/static/main.js""#));
    assert!(html.contains(r#"<a href="/static/about.html">About</a>"#));
    // fragment links are not assets
    assert!(html.contains(r##"<a href="#top">Top</a>"##));
    assert!(outdir.join("about.html").exists());
}

#[tokio::test]
async fn test_missing_script_aborts_without_output() {
    let site = tempfile::tempdir().unwrap();
    copy_fixture(site.path());
    fs::write(
        site.path().join("index.html"),
        r#"<html><body><img src="/assets/logo.svg"><script src="/src/missing.js"></script></body></html>"#,
    )
    .unwrap();

    let outdir = site.path().join("dist");
    let config = PipelineConfig {
        input_file: site.path().join("index.html"),
        output_directory: outdir.clone(),
        project_root: site.path().to_path_buf(),
        ..Default::default()
    };

    let err = pipeline(config).run().await.unwrap_err();

    match &err {
        PackError::Build(build) => assert!(build.to_string().contains("/src/missing.js")),
        other => panic!("expected a build error, got {}", other),
    }
    assert!(!outdir.join("index.html").exists());
}

#[tokio::test]
async fn test_syntax_error_is_reported_with_location() {
    let site = tempfile::tempdir().unwrap();
    copy_fixture(site.path());
    fs::write(site.path().join("lib/util.js"), "export const VERSION = '1';\nexport function greet( {\n").unwrap();

    let config = PipelineConfig {
        input_file: site.path().join("index.html"),
        output_directory: site.path().join("dist"),
        project_root: site.path().to_path_buf(),
        ..Default::default()
    };

    let err = pipeline(config).run().await.unwrap_err();

    let PackError::Build(build) = &err else {
        panic!("expected a build error, got {}", err);
    };
    let location = build.diagnostics()[0].location.as_ref().unwrap();
    assert_eq!(location.file, "lib/util.js");
    assert!(location.line >= 2);
    assert!(err.format_detailed().contains("lib/util.js:"));
}

#[tokio::test]
async fn test_dedupe_reuses_outputs() {
    let site = tempfile::tempdir().unwrap();
    copy_fixture(site.path());
    fs::write(
        site.path().join("index.html"),
        r#"<html><body><img src="/assets/logo.svg"><img src="/assets/logo.svg"></body></html>"#,
    )
    .unwrap();

    let config = PipelineConfig {
        input_file: site.path().join("index.html"),
        output_directory: site.path().join("dist"),
        project_root: site.path().to_path_buf(),
        duplicate_policy: DuplicatePolicy::Reuse,
        ..Default::default()
    };

    let report = pipeline(config).run().await.unwrap();

    assert_eq!(report.assets.len(), 2);
    assert!(!report.assets[0].reused);
    assert!(report.assets[1].reused);
    assert_eq!(report.assets[0].output, report.assets[1].output);
}

#[tokio::test]
async fn test_missing_input_file_is_a_validation_error() {
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        input_file: fixture_root().join("nope.html"),
        ..fixture_config(out.path())
    };

    let err = pipeline(config).run().await.unwrap_err();
    assert!(matches!(err, PackError::Validation(_)));
}
