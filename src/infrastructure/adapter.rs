use crate::core::interfaces::{BundleEngine, EngineOptions, EnginePlugin};
use crate::core::models::{BuildOptions, BuildOutput};
use crate::infrastructure::path_resolver::AbsolutePathPlugin;
use crate::infrastructure::processors::{DependencyScanner, ImportMetaPlugin};
use crate::utils::{BuildError, Logger, PackError, Result};
use std::sync::Arc;

/// Builds single asset references with a fixed engine configuration.
///
/// Root-relative imports resolve against the project root and JavaScript
/// modules report their `new URL(…, import.meta.url)` targets as watch files.
pub struct AssetBuilder {
    engine: Arc<dyn BundleEngine>,
    plugins: Vec<Arc<dyn EnginePlugin>>,
    options: BuildOptions,
}

impl AssetBuilder {
    pub fn new(engine: Arc<dyn BundleEngine>, options: BuildOptions) -> Result<Self> {
        let plugins: Vec<Arc<dyn EnginePlugin>> = vec![
            Arc::new(AbsolutePathPlugin::new(&options.project_root)),
            Arc::new(ImportMetaPlugin::new(DependencyScanner::new()?, &options.project_root)),
        ];

        Ok(Self {
            engine,
            plugins,
            options,
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build one entry, as written in the document, into the output directory
    pub fn build(&self, entry: &str) -> Result<BuildOutput> {
        Logger::asset_start(entry);

        let result = self.engine.build(&EngineOptions {
            entry,
            working_dir: &self.options.project_root,
            outdir: &self.options.output_directory,
            plugins: &self.plugins,
        });

        if let Some(error) = BuildError::join(result.errors) {
            return Err(error.into());
        }
        if result.output_files.is_empty() {
            return Err(PackError::NoOutputProduced(entry.to_string()));
        }

        Ok(BuildOutput {
            outputs: result.output_files,
            watch_files: result.watch_files,
        })
    }
}
