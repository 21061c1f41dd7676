use htmlpack::core::models::BuildOptions;
use htmlpack::infrastructure::{AssetBuilder, OxcBundleEngine};
use htmlpack::utils::PackError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn builder(root: &Path) -> AssetBuilder {
    AssetBuilder::new(
        Arc::new(OxcBundleEngine::new()),
        BuildOptions {
            output_directory: root.join("dist"),
            project_root: root.to_path_buf(),
        },
    )
    .unwrap()
}

#[test]
fn test_root_relative_imports_from_nested_module() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("lib/util.js"), "export const answer = 42;\n");
    write(
        &root.join("src/pages/home.js"),
        "import { answer } from '/lib/util.js';\nexport const page = 'home:' + answer;\n",
    );

    let output = builder(&root).build("/src/pages/home.js").unwrap();

    assert_eq!(output.primary(), Some(root.join("dist/home.js").as_path()));
    let js = fs::read_to_string(root.join("dist/home.js")).unwrap();
    assert!(js.contains("home:"));
    assert!(js.contains("export"));
    assert!(output.watch_files.contains(&root.join("lib/util.js")));
    assert!(output.watch_files.contains(&root.join("src/pages/home.js")));
}

#[test]
fn test_import_meta_targets_are_watched_not_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(
        &root.join("src/app.js"),
        "const a = new URL('./a.js', import.meta.url);\nconst b = new URL(\n  `/img/b.png`,\n  import.meta.url,\n);\nconsole.log(a, b);\n",
    );

    let output = builder(&root).build("/src/app.js").unwrap();

    assert_eq!(output.outputs, vec![root.join("dist/app.js")]);
    let watched: Vec<PathBuf> = output.watch_files.iter().cloned().collect();
    assert_eq!(
        watched,
        vec![root.join("img/b.png"), root.join("src/a.js"), root.join("src/app.js")]
    );
}

#[test]
fn test_relative_entry_resolves_from_project_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("styles/main.css"), "a { color: #0000ff; }\n");

    let output = builder(&root).build("styles/main.css").unwrap();

    assert_eq!(output.primary(), Some(root.join("dist/main.css").as_path()));
    assert!(fs::read_to_string(root.join("dist/main.css")).unwrap().contains("color:"));
}

#[test]
fn test_unresolvable_import_is_a_build_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("src/main.js"), "import '/lib/gone.js';\n");

    let err = builder(&root).build("/src/main.js").unwrap_err();

    let PackError::Build(build) = err else {
        panic!("expected a build error");
    };
    assert_eq!(build.len(), 1);
    let diagnostic = &build.diagnostics()[0];
    assert_eq!(diagnostic.location.as_ref().map(|l| (l.file.as_str(), l.line)), Some(("src/main.js", 1)));
    assert!(diagnostic.text.contains("/lib/gone.js"));
    assert!(!root.join("dist/main.js").exists());
}

#[test]
fn test_missing_entry_is_a_build_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let err = builder(&root).build("/src/missing.js").unwrap_err();
    assert!(matches!(err, PackError::Build(_)));
    assert!(err.to_string().contains("/src/missing.js"));
}

#[test]
fn test_builder_is_reusable_across_requests() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.js"), "export default 'a';\n");
    write(&root.join("b.js"), "import a from './a.js';\nexport default a + 'b';\n");

    let builder = builder(&root);
    assert!(builder.build("/a.js").is_ok());
    assert!(builder.build("/b.js").is_ok());
    assert!(builder.build("/a.js").is_ok());
    assert!(root.join("dist/a.js").exists());
    assert!(root.join("dist/b.js").exists());
}

#[test]
fn test_entry_with_leading_dots_in_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("..hidden.js"), "export const hidden = true;\n");

    let output = builder(&root).build("/..hidden.js").unwrap();

    assert!(output.watch_files.contains(&root.join("..hidden.js")));
    assert!(root.join("dist/..hidden.js").exists());
}
