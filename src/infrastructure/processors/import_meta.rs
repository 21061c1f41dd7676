use crate::core::interfaces::{EnginePlugin, LoadArgs, LoadedModule};
use crate::core::models::{ModuleType, WatchSet};
use crate::infrastructure::path_resolver::is_root_relative;
use crate::infrastructure::processors::DependencyScanner;
use crate::utils::{Logger, PackError, Result};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Load hook for JavaScript files that records `new URL(…, import.meta.url)`
/// targets as watch dependencies of the module.
pub struct ImportMetaPlugin {
    scanner: DependencyScanner,
    root: PathBuf,
}

impl ImportMetaPlugin {
    pub fn new(scanner: DependencyScanner, root: impl Into<PathBuf>) -> Self {
        Self {
            scanner,
            root: root.into(),
        }
    }

    fn applies_to(path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        matches!(extension.as_deref(), Some("js" | "mjs" | "cjs"))
    }

    /// File a `new URL` literal points at, as seen from `dir`
    fn dependency_path(&self, dir: &Path, literal: &str) -> Option<PathBuf> {
        // query strings and fragments do not name files
        let literal = literal.split(['?', '#']).next().unwrap_or_default();
        if literal.is_empty() || literal.contains("://") || literal.starts_with("data:") {
            return None;
        }
        if is_root_relative(literal) {
            Some(self.root.join(literal.trim_start_matches('/')).clean())
        } else {
            Some(dir.join(literal).clean())
        }
    }
}

impl EnginePlugin for ImportMetaPlugin {
    fn name(&self) -> &'static str {
        "import-meta"
    }

    fn load(&self, args: &LoadArgs<'_>) -> Option<Result<LoadedModule>> {
        if !Self::applies_to(args.path) {
            return None;
        }

        let contents = match std::fs::read_to_string(args.path) {
            Ok(contents) => contents,
            Err(e) => return Some(Err(PackError::file("read", args.path, e))),
        };

        let resolve_dir = args
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        let mut watch_files = WatchSet::new();
        watch_files.insert(args.path);
        for literal in self.scanner.scan(&contents) {
            Logger::import_meta(literal);
            if let Some(path) = self.dependency_path(&resolve_dir, literal) {
                watch_files.insert(path);
            }
        }

        Some(Ok(LoadedModule {
            contents,
            resolve_dir,
            module_type: ModuleType::JavaScript,
            watch_files,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn plugin(root: &Path) -> ImportMetaPlugin {
        ImportMetaPlugin::new(DependencyScanner::new().unwrap(), root)
    }

    #[test]
    fn test_load_collects_watch_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let script = root.join("src/main.js");
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(
            &script,
            r#"
            const worker = new URL('./worker.js', import.meta.url);
            const logo = new URL("/assets/logo.svg?inline", import.meta.url);
            const remote = new URL(`https://example.com/a.js`, import.meta.url);
            "#,
        )
        .unwrap();

        let loaded = plugin(&root).load(&LoadArgs { path: &script }).unwrap().unwrap();

        assert_eq!(loaded.module_type, ModuleType::JavaScript);
        assert_eq!(loaded.resolve_dir, root.join("src"));
        assert!(loaded.contents.contains("worker.js"));
        assert!(loaded.watch_files.contains(&script));
        assert!(loaded.watch_files.contains(&root.join("src/worker.js")));
        assert!(loaded.watch_files.contains(&root.join("assets/logo.svg")));
        assert_eq!(loaded.watch_files.len(), 3);
    }

    #[test]
    fn test_uppercase_extension_is_scanned() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let script = root.join("LEGACY.MJS");
        fs::write(&script, "new URL('./data.bin', import.meta.url);").unwrap();

        let loaded = plugin(&root).load(&LoadArgs { path: &script }).unwrap().unwrap();
        assert!(loaded.watch_files.contains(&root.join("data.bin")));
    }

    #[test]
    fn test_non_javascript_is_not_handled() {
        let dir = tempdir().unwrap();
        let style = dir.path().join("style.css");
        fs::write(&style, "body{}").unwrap();

        assert!(plugin(dir.path()).load(&LoadArgs { path: &style }).is_none());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.js");

        let result = plugin(dir.path()).load(&LoadArgs { path: &missing }).unwrap();
        assert!(result.is_err());
    }
}
