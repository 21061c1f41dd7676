use crate::core::models::{ModuleType, WatchSet};
use crate::utils::{Diagnostic, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
    async fn is_file(&self, path: &Path) -> bool;
    async fn is_dir(&self, path: &Path) -> bool;
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// The engine's own module resolution, available to resolve hooks
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, specifier: &str, resolve_dir: &Path) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    EntryPoint,
    ImportStatement,
}

#[derive(Debug, Clone)]
pub struct ResolveArgs<'a> {
    pub specifier: &'a str,
    pub importer: Option<&'a Path>,
    pub resolve_dir: &'a Path,
    pub kind: ImportKind,
}

#[derive(Debug, Clone)]
pub struct LoadArgs<'a> {
    pub path: &'a Path,
}

#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub contents: String,
    pub resolve_dir: PathBuf,
    pub module_type: ModuleType,
    pub watch_files: WatchSet,
}

/// Hook installed into a bundle engine invocation.
///
/// Returning `None` means the hook does not apply and the engine falls back to
/// the next plugin or its default behavior.
pub trait EnginePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        _args: &ResolveArgs<'_>,
        _resolver: &dyn ModuleResolver,
    ) -> Option<Result<PathBuf>> {
        None
    }

    fn load(&self, _args: &LoadArgs<'_>) -> Option<Result<LoadedModule>> {
        None
    }
}

pub struct EngineOptions<'a> {
    pub entry: &'a str,
    pub working_dir: &'a Path,
    pub outdir: &'a Path,
    pub plugins: &'a [Arc<dyn EnginePlugin>],
}

#[derive(Debug, Default)]
pub struct EngineResult {
    pub output_files: Vec<PathBuf>,
    pub errors: Vec<Diagnostic>,
    pub watch_files: WatchSet,
}

/// Bundles one entry point and writes its outputs
pub trait BundleEngine: Send + Sync {
    fn build(&self, options: &EngineOptions<'_>) -> EngineResult;
}
