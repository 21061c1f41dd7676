use crate::core::interfaces::{EnginePlugin, ModuleResolver, ResolveArgs};
use crate::utils::{PackError, Result};
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Whether `specifier` is project-root relative (`/lib/x.js` but not `//cdn/x.js`)
pub fn is_root_relative(specifier: &str) -> bool {
    specifier.starts_with('/') && !specifier.starts_with("//")
}

/// Express `root + specifier` relative to `resolve_dir`.
///
/// The result always starts with `./` or `../` and uses `/` separators, since it
/// is handed to a module resolver rather than to the file system.
pub fn relative_import(root: &Path, resolve_dir: &Path, specifier: &str) -> Result<String> {
    let fail = |reason: &str| PackError::PathResolution {
        specifier: specifier.to_string(),
        root: root.to_path_buf(),
        reason: reason.to_string(),
    };

    if !root.is_absolute() {
        return Err(fail("project root is not an absolute path"));
    }
    if !resolve_dir.is_absolute() {
        return Err(fail("resolve directory is not an absolute path"));
    }

    let target = root.join(specifier.trim_start_matches('/')).clean();
    let base = resolve_dir.clean();

    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();

    // Different prefixes (drive letters, UNC shares) cannot be bridged
    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) = (target.first(), base.first()) {
        if a != b {
            return Err(fail("project root and resolve directory are on different volumes"));
        }
    }

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        match component {
            Component::Normal(name) => match name.to_str() {
                Some(name) => parts.push(name.to_string()),
                None => return Err(fail("path is not valid UTF-8")),
            },
            _ => return Err(fail("path cannot be expressed relatively")),
        }
    }

    if parts.is_empty() {
        return Ok("./".to_string());
    }

    let joined = parts.join("/");
    if parts[0] == ".." {
        Ok(joined)
    } else {
        Ok(format!("./{}", joined))
    }
}

/// Resolve hook making `/…` imports resolve from the project root
pub struct AbsolutePathPlugin {
    root: PathBuf,
}

impl AbsolutePathPlugin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EnginePlugin for AbsolutePathPlugin {
    fn name(&self) -> &'static str {
        "absolute-path"
    }

    fn resolve(
        &self,
        args: &ResolveArgs<'_>,
        resolver: &dyn ModuleResolver,
    ) -> Option<Result<PathBuf>> {
        if !is_root_relative(args.specifier) {
            return None;
        }

        let relative = match relative_import(&self.root, args.resolve_dir, args.specifier) {
            Ok(relative) => relative,
            Err(e) => return Some(Err(e)),
        };

        Some(
            resolver
                .resolve(&relative, args.resolve_dir)
                .ok_or_else(|| PackError::PathResolution {
                    specifier: args.specifier.to_string(),
                    root: self.root.clone(),
                    reason: format!("could not resolve \"{}\"", relative),
                }),
        )
    }
}
