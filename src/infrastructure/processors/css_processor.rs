use crate::utils::{Diagnostic, Location, Timer};
use lightningcss::{
    bundler::{Bundler, FileProvider},
    error::ErrorLocation,
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions},
};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// A bundled stylesheet and every file that went into it
#[derive(Debug, Clone)]
pub struct BundledStylesheet {
    pub code: String,
    pub sources: Vec<PathBuf>,
}

/// Bundles a stylesheet with its `@import`s inlined and prints it minified
pub struct LightningCssProcessor {
    minify: bool,
}

impl LightningCssProcessor {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }

    pub fn bundle(&self, path: &Path) -> Result<BundledStylesheet, Diagnostic> {
        let _timer = Timer::start(&format!(
            "Bundling CSS {}",
            path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown")
        ));

        let fs = FileProvider::new();
        let mut bundler = Bundler::new(&fs, None, ParserOptions::default());

        let mut stylesheet = bundler.bundle(path).map_err(|e| {
            let text = e.kind.to_string();
            match e.loc {
                Some(loc) => Diagnostic::located(error_location(loc), text),
                None => Self::located(path, text),
            }
        })?;

        let sources = stylesheet
            .sources
            .iter()
            .map(|source| PathBuf::from(source).clean())
            .collect();

        if self.minify {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| Self::located(path, e.kind.to_string()))?;
        }

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                ..Default::default()
            })
            .map_err(|e| Self::located(path, e.kind.to_string()))?;

        Ok(BundledStylesheet {
            code: printed.code,
            sources,
        })
    }

    fn located(path: &Path, text: String) -> Diagnostic {
        Diagnostic::located(Location::new(path.display().to_string(), 1, 0), text)
    }
}

/// lightningcss lines are 0-based and columns 1-based
fn error_location(loc: ErrorLocation) -> Location {
    Location::new(loc.filename, loc.line + 1, loc.column.saturating_sub(1))
}

impl Default for LightningCssProcessor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_bundle_inlines_imports_and_minifies() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("base.css"), "body {\n  margin: 0px;\n}\n").unwrap();
        fs::write(
            dir.path().join("main.css"),
            "@import \"base.css\";\n.title {\n  color: #ff0000;\n}\n",
        )
        .unwrap();

        let processor = LightningCssProcessor::new(true);
        let bundled = processor.bundle(&dir.path().join("main.css")).unwrap();
        let css = &bundled.code;

        assert!(css.contains("body{margin:0}"));
        assert!(css.contains(".title{color:red}"));
        assert!(!css.contains("@import"));
        assert!(bundled.sources.contains(&dir.path().join("main.css")));
        assert!(bundled.sources.contains(&dir.path().join("base.css")));
    }

    #[test]
    fn test_error_location_is_one_based_line_zero_based_column() {
        let location = error_location(ErrorLocation {
            filename: "site.css".to_string(),
            line: 2,
            column: 5,
        });
        assert_eq!(location, Location::new("site.css", 3, 4));

        let start = error_location(ErrorLocation {
            filename: "site.css".to_string(),
            line: 0,
            column: 0,
        });
        assert_eq!(start, Location::new("site.css", 1, 0));
    }

    #[test]
    fn test_missing_import_is_a_diagnostic() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.css"), "@import \"missing.css\";\n").unwrap();

        let processor = LightningCssProcessor::new(true);
        assert!(processor.bundle(&dir.path().join("main.css")).is_err());
    }
}
