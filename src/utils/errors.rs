use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Source position attached to an engine diagnostic.
///
/// Lines are 1-based and columns 0-based, matching what bundlers usually report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Compute the location of a byte offset inside `source`
    pub fn from_offset(file: impl Into<String>, source: &str, offset: u32) -> Self {
        let (line, column) = line_column(source, offset);
        Self::new(file, line, column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One message reported by the bundle engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<Location>,
    pub text: String,
}

impl Diagnostic {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            location: None,
            text: text.into(),
        }
    }

    pub fn located(location: Location, text: impl Into<String>) -> Self {
        Self {
            location: Some(location),
            text: text.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Aggregate of every diagnostic an engine invocation reported, in report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    diagnostics: Vec<Diagnostic>,
}

impl BuildError {
    /// Join diagnostics into one error. Joining nothing is not an error.
    pub fn join<I>(diagnostics: I) -> Option<Self>
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        let diagnostics: Vec<Diagnostic> = diagnostics.into_iter().collect();
        if diagnostics.is_empty() {
            None
        } else {
            Some(Self { diagnostics })
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildError {}

#[derive(Error, Debug)]
pub enum PackError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid tag {0:?}")]
    InvalidTag(String),

    #[error("failed to resolve {specifier} in {}: {reason}", root.display())]
    PathResolution {
        specifier: String,
        root: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("no output files were produced for {0}")]
    NoOutputProduced(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to {action} {}: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl PackError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn file(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            action,
            path: path.into(),
            source,
        }
    }

    /// Format error with one line per engine diagnostic
    pub fn format_detailed(&self) -> String {
        match self {
            PackError::Build(build) => {
                let mut output = format!("❌ Build failed with {} error(s)", build.len());
                for diagnostic in build.diagnostics() {
                    match &diagnostic.location {
                        Some(location) => {
                            output.push_str(&format!("\n📍 {}\n   {}", location, diagnostic.text))
                        }
                        None => output.push_str(&format!("\n   {}", diagnostic.text)),
                    }
                }
                output
            }
            _ => format!("❌ {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;

impl From<regex::Error> for PackError {
    fn from(err: regex::Error) -> Self {
        PackError::config(format!("Regex error: {}", err))
    }
}

/// 1-based line, 0-based column of a byte offset
pub fn line_column(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let column = source
        .get(line_start..offset)
        .map(|s| s.chars().count())
        .unwrap_or(offset - line_start) as u32;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_nothing_is_success() {
        assert!(BuildError::join(Vec::new()).is_none());
    }

    #[test]
    fn test_join_one_located_diagnostic() {
        let error = BuildError::join(vec![Diagnostic::located(
            Location::new("src/main.js", 3, 7),
            "Expected \";\"",
        )])
        .unwrap();

        let message = error.to_string();
        assert!(message.contains("src/main.js"));
        assert!(message.contains(":3:"));
        assert!(message.contains(":7"));
        assert!(message.contains("Expected"));
    }

    #[test]
    fn test_join_keeps_report_order() {
        let error = BuildError::join(vec![
            Diagnostic::new("first failure"),
            Diagnostic::located(Location::new("b.js", 1, 0), "second failure"),
        ])
        .unwrap();

        let message = error.to_string();
        let first = message.find("first failure").unwrap();
        let second = message.find("second failure").unwrap();
        assert!(first < second);
        assert_eq!(error.len(), 2);
    }

    #[test]
    fn test_line_column() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_column(source, 0), (1, 0));
        assert_eq!(line_column(source, 6), (2, 0));
        assert_eq!(line_column(source, 9), (2, 3));
        assert_eq!(line_column(source, 100), (3, 5));
    }

    #[test]
    fn test_format_detailed_lists_locations() {
        let error = PackError::Build(
            BuildError::join(vec![Diagnostic::located(
                Location::new("a.js", 2, 4),
                "Unexpected token",
            )])
            .unwrap(),
        );

        let detailed = error.format_detailed();
        assert!(detailed.contains("1 error"));
        assert!(detailed.contains("a.js:2:4"));
    }
}
