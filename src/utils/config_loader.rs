use crate::core::models::{DuplicatePolicy, PipelineConfig};
use crate::utils::{Logger, PackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "htmlpack.config.json";

/// Configuration file format (htmlpack.config.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    /// Output directory, relative to the project root (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,

    /// Tag name → attribute name holding an asset reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<BTreeMap<String, String>>,

    /// Also build `<a href>` references (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_anchors: Option<bool>,

    /// `rebuild` or `reuse` (default: rebuild)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedupe: Option<DuplicatePolicy>,

    /// Prefix for rewritten references, e.g. "/static/"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input_file: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub include_anchors: bool,
    pub dedupe: bool,
    pub public_path: Option<String>,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the config file from the project root if there is one
    pub fn load_from_file(root: &Path) -> Result<Option<FileConfig>> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.is_file() {
            Logger::debug(&format!("No {} found, using defaults", CONFIG_FILE_NAME));
            return Ok(None);
        }

        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| PackError::file("read", &config_path, e))?;

        let config: FileConfig = serde_json::from_str(&content).map_err(|e| {
            PackError::config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))
        })?;

        Logger::debug("✅ Config file loaded successfully");
        Ok(Some(config))
    }

    /// Merge file config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(file_config: Option<FileConfig>, root: PathBuf, cli: CliOverrides) -> PipelineConfig {
        let base = file_config.unwrap_or_default();
        let defaults = PipelineConfig::default();

        // Relative output directories are resolved against the project root later
        let output_directory = cli
            .output_directory
            .or_else(|| base.output_directory.map(PathBuf::from))
            .unwrap_or(defaults.output_directory);

        PipelineConfig {
            input_file: cli.input_file.unwrap_or(defaults.input_file),
            output_directory,
            project_root: root,
            targets: base.targets.unwrap_or_default(),
            include_anchors: cli.include_anchors || base.include_anchors.unwrap_or(false),
            duplicate_policy: if cli.dedupe {
                DuplicatePolicy::Reuse
            } else {
                base.dedupe.unwrap_or_default()
            },
            public_path: cli.public_path.or(base.public_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file_not_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from_file(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_from_file_valid() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{"outputDirectory": "build", "dedupe": "reuse", "targets": {"video": "poster"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.output_directory, Some("build".to_string()));
        assert_eq!(config.dedupe, Some(DuplicatePolicy::Reuse));
        assert_eq!(config.targets.unwrap()["video"], "poster");
    }

    #[test]
    fn test_load_from_file_rejects_unknown_fields() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"outdir": "build"}"#).unwrap();

        let err = ConfigLoader::load_from_file(temp_dir.path()).unwrap_err();
        assert!(matches!(err, PackError::Config(_)));
    }

    #[test]
    fn test_merge_with_cli_override() {
        let file_config = FileConfig {
            output_directory: Some("build".to_string()),
            public_path: Some("/from-file/".to_string()),
            ..Default::default()
        };

        let merged = ConfigLoader::merge_with_cli(
            Some(file_config.clone()),
            PathBuf::from("/proj"),
            CliOverrides {
                output_directory: Some(PathBuf::from("dist-override")),
                dedupe: true,
                ..Default::default()
            },
        );
        assert_eq!(merged.output_directory, PathBuf::from("dist-override"));
        assert_eq!(merged.duplicate_policy, DuplicatePolicy::Reuse);
        assert_eq!(merged.public_path.as_deref(), Some("/from-file/"));

        let merged = ConfigLoader::merge_with_cli(Some(file_config), PathBuf::from("/proj"), CliOverrides::default());
        assert_eq!(merged.output_directory, PathBuf::from("build"));
        assert_eq!(merged.input_file, PathBuf::from("./index.html"));
        assert_eq!(merged.duplicate_policy, DuplicatePolicy::Rebuild);
    }
}
