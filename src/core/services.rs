use crate::core::{interfaces::*, models::*};
use crate::infrastructure::{AssetBuilder, Document, TargetMap};
use crate::utils::{Logger, PackError, Result, Timer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Schemes whose references point outside the project
const EXTERNAL_SCHEMES: [&str; 5] = ["http:", "https:", "data:", "mailto:", "javascript:"];

/// Builds every asset an HTML entry file references and writes the rewritten
/// document to the output directory.
pub struct AssetPipeline {
    fs_service: Arc<dyn FileSystemService>,
    engine: Arc<dyn BundleEngine>,
    config: PipelineConfig,
}

impl AssetPipeline {
    pub fn new(
        fs_service: Arc<dyn FileSystemService>,
        engine: Arc<dyn BundleEngine>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fs_service,
            engine,
            config,
        }
    }

    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();

        let input_file = self.config.input_file.clone();
        self.validate(&input_file).await?;

        let project_root = self.fs_service.canonicalize(&self.config.project_root).await?;
        let output_directory = if self.config.output_directory.is_absolute() {
            self.config.output_directory.clone()
        } else {
            project_root.join(&self.config.output_directory)
        };
        let targets = self.targets()?;

        Logger::build_start(&input_file, &output_directory, &project_root);

        let source = self.fs_service.read_file(&input_file).await?;
        let document = {
            let _timer = Timer::start("Parsing HTML");
            Document::parse(&input_file, &source)?
        };

        let builder = AssetBuilder::new(
            Arc::clone(&self.engine),
            BuildOptions {
                output_directory: output_directory.clone(),
                project_root,
            },
        )?;
        let policy = self.config.duplicate_policy;
        let public_path = self.config.public_path.clone();

        // Engine builds block, so the whole walk runs off the async workers
        let (document, assets, watch_files) = tokio::task::spawn_blocking(move || -> Result<_> {
            let mut document = document;
            let mut rewriter = ReferenceRewriter::new(&builder, policy, public_path);
            document.walk(&targets, |reference| rewriter.rewrite(reference))?;
            let (assets, watch_files) = rewriter.finish();
            Ok((document, assets, watch_files))
        })
        .await
        .map_err(|e| PackError::Task(format!("asset walk failed: {}", e)))??;

        let html = document.serialize()?;
        let output_file = output_directory.join(file_name(&input_file)?);
        self.fs_service.write_file(&output_file, &html).await?;

        Logger::build_complete(assets.len(), watch_files.len(), start.elapsed(), &output_file);

        Ok(PipelineReport {
            output_file,
            assets,
            watch_files,
        })
    }

    async fn validate(&self, input_file: &Path) -> Result<()> {
        if self.fs_service.is_dir(input_file).await {
            return Err(PackError::validation(format!(
                "input file {} is a directory",
                input_file.display()
            )));
        }
        if !self.fs_service.is_file(input_file).await {
            return Err(PackError::validation(format!(
                "input file {} does not exist",
                input_file.display()
            )));
        }
        if !self.fs_service.is_dir(&self.config.project_root).await {
            return Err(PackError::validation(format!(
                "project root {} is not a directory",
                self.config.project_root.display()
            )));
        }
        Ok(())
    }

    fn targets(&self) -> Result<TargetMap> {
        let targets = if self.config.targets.is_empty() {
            TargetMap::new()
        } else {
            TargetMap::from_config(&self.config.targets)?
        };
        Ok(if self.config.include_anchors {
            targets.with_anchors()
        } else {
            targets
        })
    }
}

/// Builds each reference met during a walk and produces its replacement
struct ReferenceRewriter<'a> {
    builder: &'a AssetBuilder,
    policy: DuplicatePolicy,
    public_path: Option<String>,
    built: HashMap<String, String>,
    assets: Vec<BuiltAsset>,
    watch_files: WatchSet,
}

impl<'a> ReferenceRewriter<'a> {
    fn new(builder: &'a AssetBuilder, policy: DuplicatePolicy, public_path: Option<String>) -> Self {
        Self {
            builder,
            policy,
            public_path,
            built: HashMap::new(),
            assets: Vec::new(),
            watch_files: WatchSet::new(),
        }
    }

    fn rewrite(&mut self, reference: &str) -> Result<String> {
        if is_external(reference) {
            Logger::external_skipped(reference);
            return Ok(reference.to_string());
        }

        if self.policy == DuplicatePolicy::Reuse {
            if let Some(output) = self.built.get(reference) {
                Logger::asset_reused(reference, output);
                self.assets.push(BuiltAsset {
                    reference: reference.to_string(),
                    output: output.clone(),
                    reused: true,
                });
                return Ok(output.clone());
            }
        }

        let built = self.builder.build(reference)?;
        let primary = built
            .primary()
            .ok_or_else(|| PackError::NoOutputProduced(reference.to_string()))?;
        let output = self.href_for(primary);

        Logger::asset_built(reference, &output);
        self.watch_files.extend(built.watch_files);
        self.built.insert(reference.to_string(), output.clone());
        self.assets.push(BuiltAsset {
            reference: reference.to_string(),
            output: output.clone(),
            reused: false,
        });
        Ok(output)
    }

    /// Reference text for an output file: relative to the output directory,
    /// behind the public path when one is configured
    fn href_for(&self, output: &Path) -> String {
        let relative = output
            .strip_prefix(&self.builder.options().output_directory)
            .unwrap_or(output)
            .to_string_lossy()
            .replace('\\', "/");

        match &self.public_path {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), relative),
            None => relative,
        }
    }

    fn finish(self) -> (Vec<BuiltAsset>, WatchSet) {
        (self.assets, self.watch_files)
    }
}

/// Whether a reference points somewhere the pipeline should not build
pub fn is_external(reference: &str) -> bool {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || reference.starts_with("//") {
        return true;
    }
    let lower = reference.to_ascii_lowercase();
    EXTERNAL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

fn file_name(path: &Path) -> Result<PathBuf> {
    path.file_name()
        .map(PathBuf::from)
        .ok_or_else(|| PackError::validation(format!("input file {} has no file name", path.display())))
}
