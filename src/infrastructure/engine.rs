use crate::core::interfaces::{
    BundleEngine, EngineOptions, EngineResult, ImportKind, LoadArgs, LoadedModule, ResolveArgs,
};
use crate::core::interfaces::ModuleResolver;
use crate::core::models::{ModuleType, WatchSet};
use crate::infrastructure::node_resolver::NodeModuleResolver;
use crate::infrastructure::processors::{
    analyze_module, render_bundle, LightningCssProcessor, LinkedModule, ModuleRecord, OxcMinifier,
};
use crate::utils::{Diagnostic, IncrementalCache, Location, Logger, PackError, Result, Timer};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bundle engine built on oxc for JavaScript and lightningcss for stylesheets.
///
/// One engine is meant to live for the whole process: analyzed modules are
/// cached by content hash and reused by later builds.
pub struct OxcBundleEngine {
    resolver: NodeModuleResolver,
    modules: IncrementalCache<ModuleRecord>,
    minifier: OxcMinifier,
    css: LightningCssProcessor,
}

struct OutputFile {
    path: PathBuf,
    contents: Vec<u8>,
}

struct GraphNode {
    id: String,
    record: Arc<ModuleRecord>,
    dependency_ids: Vec<String>,
}

#[derive(Default)]
struct BuildState {
    errors: Vec<Diagnostic>,
    watch_files: WatchSet,
}

impl OxcBundleEngine {
    pub fn new() -> Self {
        Self {
            resolver: NodeModuleResolver::new(),
            modules: IncrementalCache::new(),
            minifier: OxcMinifier::new(),
            css: LightningCssProcessor::new(true),
        }
    }

    /// Number of analyzed modules kept for reuse
    pub fn cached_modules(&self) -> usize {
        self.modules.len()
    }

    fn resolve(
        &self,
        options: &EngineOptions<'_>,
        specifier: &str,
        importer: Option<&Path>,
        resolve_dir: &Path,
        kind: ImportKind,
    ) -> Result<PathBuf> {
        let args = ResolveArgs {
            specifier,
            importer,
            resolve_dir,
            kind,
        };
        for plugin in options.plugins {
            if let Some(result) = plugin.resolve(&args, &self.resolver) {
                Logger::debug(&format!("{} resolved {}", plugin.name(), specifier));
                return result;
            }
        }

        // Entry points name files, so `main.js` means `./main.js` before it means a package
        let bare = !specifier.starts_with('.') && !specifier.starts_with('/') && !Path::new(specifier).is_absolute();
        if kind == ImportKind::EntryPoint && bare {
            if let Some(path) = self.resolver.resolve(&format!("./{}", specifier), resolve_dir) {
                return Ok(path);
            }
        }

        self.resolver
            .resolve(specifier, resolve_dir)
            .ok_or_else(|| PackError::PathResolution {
                specifier: specifier.to_string(),
                root: resolve_dir.to_path_buf(),
                reason: "no matching file or package".to_string(),
            })
    }

    fn load(&self, options: &EngineOptions<'_>, path: &Path) -> Result<LoadedModule> {
        let args = LoadArgs { path };
        for plugin in options.plugins {
            if let Some(result) = plugin.load(&args) {
                return result;
            }
        }

        let contents = std::fs::read_to_string(path).map_err(|e| PackError::file("read", path, e))?;
        let mut watch_files = WatchSet::new();
        watch_files.insert(path);

        Ok(LoadedModule {
            contents,
            resolve_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            module_type: ModuleType::from_path(path),
            watch_files,
        })
    }

    fn bundle_javascript(
        &self,
        options: &EngineOptions<'_>,
        entry: &Path,
        state: &mut BuildState,
    ) -> Vec<OutputFile> {
        let _timer = Timer::start(&format!("Bundling {}", entry.display()));

        let entry_id = module_id(options.working_dir, entry);
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::from([entry.to_path_buf()]);
        let mut queue: VecDeque<(PathBuf, Option<Location>)> = VecDeque::from([(entry.to_path_buf(), None)]);
        let mut stylesheets: Vec<PathBuf> = Vec::new();
        let mut assets: Vec<PathBuf> = Vec::new();

        while let Some((path, origin)) = queue.pop_front() {
            let id = module_id(options.working_dir, &path);

            let loaded = match self.load(options, &path) {
                Ok(loaded) => loaded,
                Err(e) => {
                    state.errors.push(at(origin, e));
                    continue;
                }
            };
            state.watch_files.extend(loaded.watch_files);

            let record = match self
                .modules
                .get_or_compute(&path, loaded.contents.as_bytes(), || analyze_module(&id, &loaded.contents))
            {
                Ok(record) => record,
                Err(diagnostics) => {
                    state.errors.extend(diagnostics);
                    continue;
                }
            };

            let mut dependency_ids = Vec::with_capacity(record.imports.len());
            for import in &record.imports {
                let site = Location::from_offset(id.clone(), &loaded.contents, import.offset);
                let resolved = match self.resolve(
                    options,
                    &import.specifier,
                    Some(&path),
                    &loaded.resolve_dir,
                    ImportKind::ImportStatement,
                ) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        state.errors.push(Diagnostic::located(site, e.to_string()));
                        dependency_ids.push(String::new());
                        continue;
                    }
                };

                let dependency_id = module_id(options.working_dir, &resolved);
                dependency_ids.push(dependency_id.clone());
                if !seen.insert(resolved.clone()) {
                    continue;
                }

                match ModuleType::from_path(&resolved) {
                    ModuleType::JavaScript => queue.push_back((resolved, Some(site))),
                    ModuleType::Css => {
                        state.watch_files.insert(&resolved);
                        stylesheets.push(resolved);
                        nodes.push(GraphNode {
                            id: dependency_id,
                            record: Arc::new(ModuleRecord::empty()),
                            dependency_ids: Vec::new(),
                        });
                    }
                    ModuleType::Json => {
                        state.watch_files.insert(&resolved);
                        match json_module(&resolved, &dependency_id) {
                            Ok(record) => nodes.push(GraphNode {
                                id: dependency_id,
                                record: Arc::new(record),
                                dependency_ids: Vec::new(),
                            }),
                            Err(diagnostic) => state.errors.push(diagnostic),
                        }
                    }
                    ModuleType::Asset => {
                        state.watch_files.insert(&resolved);
                        let url = format!("./{}", file_name(&resolved));
                        nodes.push(GraphNode {
                            id: dependency_id,
                            record: Arc::new(ModuleRecord::default_export(json_string(&url))),
                            dependency_ids: Vec::new(),
                        });
                        assets.push(resolved);
                    }
                }
            }

            nodes.push(GraphNode {
                id,
                record,
                dependency_ids,
            });
        }

        if !state.errors.is_empty() {
            return Vec::new();
        }

        let linked: Vec<LinkedModule<'_>> = nodes
            .iter()
            .map(|node| LinkedModule {
                id: node.id.clone(),
                record: node.record.as_ref(),
                dependency_ids: node.dependency_ids.clone(),
            })
            .collect();
        let Some(entry_module) = linked.iter().find(|module| module.id == entry_id) else {
            state.errors.push(Diagnostic::new(format!("{} was not bundled", entry_id)));
            return Vec::new();
        };

        let stem = file_stem(entry);
        let bundle_name = format!("{}.js", stem);
        let bundle = render_bundle(&linked, entry_module);
        let code = match self.minifier.minify(&bundle, &bundle_name) {
            Ok(code) => {
                Logger::debug(&format!(
                    "{} minified ({:.1}% smaller)",
                    bundle_name,
                    self.minifier.calculate_reduction(&bundle, &code)
                ));
                code
            }
            Err(diagnostics) => {
                state.errors.extend(diagnostics);
                return Vec::new();
            }
        };

        let mut outputs = vec![OutputFile {
            path: options.outdir.join(&bundle_name),
            contents: code.into_bytes(),
        }];

        if !stylesheets.is_empty() {
            let mut css = String::new();
            for stylesheet in &stylesheets {
                match self.css.bundle(stylesheet) {
                    Ok(bundled) => {
                        css.push_str(&bundled.code);
                        for source in &bundled.sources {
                            state.watch_files.insert(source);
                        }
                    }
                    Err(diagnostic) => state.errors.push(diagnostic),
                }
            }
            outputs.push(OutputFile {
                path: options.outdir.join(format!("{}.css", stem)),
                contents: css.into_bytes(),
            });
        }

        for asset in &assets {
            match copy_of(asset, options.outdir) {
                Ok(output) => outputs.push(output),
                Err(e) => state.errors.push(Diagnostic::new(e.to_string())),
            }
        }

        outputs
    }

    fn bundle_stylesheet(&self, options: &EngineOptions<'_>, entry: &Path, state: &mut BuildState) -> Vec<OutputFile> {
        state.watch_files.insert(entry);
        match self.css.bundle(entry) {
            Ok(bundled) => {
                // `@import`ed files are inlined, so they are watched too
                for source in &bundled.sources {
                    state.watch_files.insert(source);
                }
                vec![OutputFile {
                    path: options.outdir.join(format!("{}.css", file_stem(entry))),
                    contents: bundled.code.into_bytes(),
                }]
            }
            Err(diagnostic) => {
                state.errors.push(diagnostic);
                Vec::new()
            }
        }
    }

    fn write_outputs(&self, outdir: &Path, outputs: Vec<OutputFile>, state: &mut BuildState) -> Vec<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(outdir) {
            state.errors.push(Diagnostic::new(PackError::file("create", outdir, e).to_string()));
            return Vec::new();
        }

        let mut written = Vec::with_capacity(outputs.len());
        for output in outputs {
            if written.contains(&output.path) {
                Logger::warn(&format!("{} is produced twice, keeping the first", output.path.display()));
                continue;
            }
            if let Err(e) = std::fs::write(&output.path, &output.contents) {
                state.errors.push(Diagnostic::new(PackError::file("write to", &output.path, e).to_string()));
                return Vec::new();
            }
            written.push(output.path);
        }
        written
    }
}

impl Default for OxcBundleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleEngine for OxcBundleEngine {
    fn build(&self, options: &EngineOptions<'_>) -> EngineResult {
        let mut state = BuildState::default();

        let entry = match self.resolve(options, options.entry, None, options.working_dir, ImportKind::EntryPoint) {
            Ok(entry) => entry,
            Err(e) => {
                return EngineResult {
                    errors: vec![Diagnostic::new(e.to_string())],
                    ..Default::default()
                }
            }
        };

        let outputs = match ModuleType::from_path(&entry) {
            ModuleType::JavaScript => self.bundle_javascript(options, &entry, &mut state),
            ModuleType::Css => self.bundle_stylesheet(options, &entry, &mut state),
            ModuleType::Json | ModuleType::Asset => {
                state.watch_files.insert(&entry);
                match copy_of(&entry, options.outdir) {
                    Ok(output) => vec![output],
                    Err(e) => {
                        state.errors.push(Diagnostic::new(e.to_string()));
                        Vec::new()
                    }
                }
            }
        };

        let output_files = if state.errors.is_empty() {
            self.write_outputs(options.outdir, outputs, &mut state)
        } else {
            Vec::new()
        };

        EngineResult {
            output_files,
            errors: state.errors,
            watch_files: state.watch_files,
        }
    }
}

/// Registry id of a module: its path relative to the working directory
fn module_id(working_dir: &Path, path: &Path) -> String {
    path.strip_prefix(working_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn at(origin: Option<Location>, error: PackError) -> Diagnostic {
    match origin {
        Some(location) => Diagnostic::located(location, error.to_string()),
        None => Diagnostic::new(error.to_string()),
    }
}

fn json_module(path: &Path, id: &str) -> std::result::Result<ModuleRecord, Diagnostic> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Diagnostic::new(PackError::file("read", path, e).to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
        Diagnostic::located(
            Location::new(id, e.line() as u32, e.column().saturating_sub(1) as u32),
            e.to_string(),
        )
    })?;
    Ok(ModuleRecord::default_export(value.to_string()))
}

fn copy_of(path: &Path, outdir: &Path) -> Result<OutputFile> {
    let contents = std::fs::read(path).map_err(|e| PackError::file("read", path, e))?;
    Ok(OutputFile {
        path: outdir.join(file_name(path)),
        contents,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string())
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}
