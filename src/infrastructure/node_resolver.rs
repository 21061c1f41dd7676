use crate::core::interfaces::ModuleResolver;
use dashmap::DashMap;
use path_clean::PathClean;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["js", "mjs", "cjs", "json"];
const INDEX_FILES: [&str; 3] = ["index.js", "index.mjs", "index.json"];
const EXPORT_CONDITIONS: [&str; 4] = ["browser", "import", "module", "default"];

/// Package.json fields that matter for resolution
#[derive(Debug, Clone, Deserialize)]
pub struct PackageJson {
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub browser: Option<serde_json::Value>,
    #[serde(default)]
    pub exports: Option<serde_json::Value>,
}

/// Node.js-style module resolution implementation
pub struct NodeModuleResolver {
    /// Cache of package.json files
    package_cache: DashMap<PathBuf, Option<PackageJson>>,
}

impl ModuleResolver for NodeModuleResolver {
    fn resolve(&self, specifier: &str, resolve_dir: &Path) -> Option<PathBuf> {
        // Handle relative imports
        if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            return self.resolve_file_or_directory(&resolve_dir.join(specifier).clean());
        }

        // Absolute file system paths
        if Path::new(specifier).is_absolute() {
            return self.resolve_file_or_directory(&PathBuf::from(specifier).clean());
        }

        self.resolve_node_module(specifier, resolve_dir)
    }
}

impl NodeModuleResolver {
    pub fn new() -> Self {
        Self {
            package_cache: DashMap::new(),
        }
    }

    /// Walk up from `resolve_dir` looking for `node_modules/<package>`
    fn resolve_node_module(&self, specifier: &str, resolve_dir: &Path) -> Option<PathBuf> {
        let (pkg_name, subpath) = Self::parse_package_specifier(specifier);

        let mut current = Some(resolve_dir);
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(&pkg_name);
            if package_dir.is_dir() {
                if let Some(entry) = self.resolve_package_entry(&package_dir, subpath.as_deref()) {
                    return Some(entry);
                }
            }
            current = dir.parent();
        }

        None
    }

    /// Parse package specifier into package name and subpath
    fn parse_package_specifier(specifier: &str) -> (String, Option<String>) {
        let mut parts = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
        let name = if specifier.starts_with('@') {
            match (parts.next(), parts.next()) {
                (Some(scope), Some(pkg)) => format!("{}/{}", scope, pkg),
                _ => return (specifier.to_string(), None),
            }
        } else {
            parts.next().unwrap_or(specifier).to_string()
        };
        let subpath = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        (name, subpath)
    }

    /// Resolve package entry point
    fn resolve_package_entry(&self, package_dir: &Path, subpath: Option<&str>) -> Option<PathBuf> {
        let package_json = self.read_package_json(&package_dir.join("package.json"));

        if let Some(exports) = package_json.as_ref().and_then(|pkg| pkg.exports.as_ref()) {
            let key = match subpath {
                Some(subpath) => format!("./{}", subpath),
                None => ".".to_string(),
            };
            if let Some(target) = Self::export_target(exports, &key) {
                return self.resolve_as_file(&package_dir.join(target).clean());
            }
        }

        if let Some(subpath) = subpath {
            return self.resolve_file_or_directory(&package_dir.join(subpath).clean());
        }

        if let Some(pkg) = &package_json {
            let browser = pkg.browser.as_ref().and_then(|b| b.as_str());
            for field in [pkg.module.as_deref(), browser, pkg.main.as_deref()].into_iter().flatten() {
                if let Some(resolved) = self.resolve_file_or_directory(&package_dir.join(field).clean()) {
                    return Some(resolved);
                }
            }
        }

        self.resolve_index(package_dir)
    }

    /// Pick the target of `key` from a package.json `exports` value
    fn export_target(exports: &serde_json::Value, key: &str) -> Option<String> {
        use serde_json::Value;

        let entry = match exports {
            Value::String(_) | Value::Array(_) if key == "." => exports,
            Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => map.get(key)?,
            Value::Object(_) if key == "." => exports,
            _ => return None,
        };
        Self::conditional_target(entry)
    }

    fn conditional_target(value: &serde_json::Value) -> Option<String> {
        use serde_json::Value;

        match value {
            Value::String(target) => Some(target.clone()),
            Value::Array(items) => items.iter().find_map(Self::conditional_target),
            Value::Object(map) => EXPORT_CONDITIONS
                .iter()
                .find_map(|condition| map.get(*condition).and_then(Self::conditional_target)),
            _ => None,
        }
    }

    /// Try to resolve as file or directory
    fn resolve_file_or_directory(&self, path: &Path) -> Option<PathBuf> {
        if let Some(file) = self.resolve_as_file(path) {
            return Some(file);
        }

        if !path.is_dir() {
            return None;
        }

        if let Some(pkg) = self.read_package_json(&path.join("package.json")) {
            if let Some(main) = pkg.module.as_deref().or(pkg.main.as_deref()) {
                if let Some(resolved) = self.resolve_as_file(&path.join(main).clean()) {
                    return Some(resolved);
                }
            }
        }

        self.resolve_index(path)
    }

    fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        INDEX_FILES
            .iter()
            .map(|index| dir.join(index))
            .find(|candidate| candidate.is_file())
    }

    /// Try to resolve as a file with various extensions
    fn resolve_as_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        // Append rather than replace, so `util.min` tries `util.min.js`
        EXTENSIONS.iter().find_map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            candidate.is_file().then_some(candidate)
        })
    }

    /// Read and cache package.json
    fn read_package_json(&self, path: &Path) -> Option<PackageJson> {
        if let Some(cached) = self.package_cache.get(path) {
            return cached.value().clone();
        }

        let package = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<PackageJson>(&content).ok());

        self.package_cache.insert(path.to_path_buf(), package.clone());
        package
    }
}

impl Default for NodeModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}
