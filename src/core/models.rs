use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Options every build request of one pipeline run shares
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub output_directory: PathBuf,
    /// Absolute, canonical project root
    pub project_root: PathBuf,
}

/// Files a build output depends on; an external watcher can subscribe to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    files: BTreeSet<PathBuf>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.files.insert(path.into())
    }

    pub fn extend(&mut self, other: WatchSet) {
        self.files.extend(other.files);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<PathBuf> for WatchSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Successful result of building one asset reference
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Written files; the first one is the bundled entry
    pub outputs: Vec<PathBuf>,
    pub watch_files: WatchSet,
}

impl BuildOutput {
    pub fn primary(&self) -> Option<&Path> {
        self.outputs.first().map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    JavaScript,
    Css,
    Json,
    Asset,
}

impl ModuleType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => ModuleType::JavaScript,
            "css" => ModuleType::Css,
            "json" => ModuleType::Json,
            _ => ModuleType::Asset,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(ModuleType::Asset)
    }
}

/// What to do when the same reference shows up more than once in a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Build every occurrence
    #[default]
    Rebuild,
    /// Build the first occurrence and substitute its output for the others
    Reuse,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_file: PathBuf,
    pub output_directory: PathBuf,
    pub project_root: PathBuf,
    /// Tag name → asset attribute name; empty means the default targets
    pub targets: BTreeMap<String, String>,
    pub include_anchors: bool,
    pub duplicate_policy: DuplicatePolicy,
    pub public_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("./index.html"),
            output_directory: PathBuf::from("./dist"),
            project_root: PathBuf::from("."),
            targets: BTreeMap::new(),
            include_anchors: false,
            duplicate_policy: DuplicatePolicy::Rebuild,
            public_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltAsset {
    /// Reference text as it appeared in the document
    pub reference: String,
    /// Reference text written back into the document
    pub output: String,
    pub reused: bool,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub output_file: PathBuf,
    pub assets: Vec<BuiltAsset>,
    pub watch_files: WatchSet,
}
