use crate::utils::Result;
use regex::{CaptureMatches, Regex};

const IMPORT_META_URL: &str = "import.meta.url";
const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Finds the path literal of every `new URL("…", import.meta.url)` in JavaScript source.
///
/// This is a textual scan, not a parse: string literals containing their own
/// delimiter (escaped or not) are not recognized.
#[derive(Debug, Clone)]
pub struct DependencyScanner {
    pattern: Regex,
}

impl DependencyScanner {
    pub fn new() -> Result<Self> {
        let literals = QUOTES
            .iter()
            .map(|q| format!("{q}[^{q}]*{q}"))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(
            r"\bnew\s+URL\s*\(\s*({literals})\s*,\s*import\.meta\.url\s*(?:,\s*)?\)"
        ))?;
        Ok(Self { pattern })
    }

    /// Lazily yield the path literals found in `text`, in source order
    pub fn scan<'r, 't>(&'r self, text: &'t str) -> Scan<'r, 't> {
        let matches = if text.contains(IMPORT_META_URL) {
            Some(self.pattern.captures_iter(text))
        } else {
            None
        };
        Scan { matches }
    }
}

pub struct Scan<'r, 't> {
    matches: Option<CaptureMatches<'r, 't>>,
}

impl<'r, 't> Iterator for Scan<'r, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        let captures = self.matches.as_mut()?.next()?;
        let literal = captures.get(1)?.as_str();
        // strip the quote characters; all three are single-byte
        Some(&literal[1..literal.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<String> {
        let scanner = DependencyScanner::new().unwrap();
        scanner.scan(text).map(str::to_string).collect()
    }

    #[test]
    fn test_single_match() {
        assert_eq!(scan("new URL('./a.js', import.meta.url)"), vec!["./a.js"]);
    }

    #[test]
    fn test_no_import_meta_url_yields_nothing() {
        let source = r#"
            const a = new URL('./a.js', location.href);
            const b = new URL("https://example.com");
        "#;
        assert!(scan(source).is_empty());
    }

    #[test]
    fn test_mixed_quotes_in_source_order() {
        let source = r#"
            const a = new URL("./a.js", import.meta.url);
            const b = new URL('./b.js', import.meta.url);
        "#;
        assert_eq!(scan(source), vec!["./a.js", "./b.js"]);
    }

    #[test]
    fn test_backticks_whitespace_and_trailing_comma() {
        let source = "const worker = new   URL(\n  `./worker.js`,\n  import.meta.url,\n);";
        assert_eq!(scan(source), vec!["./worker.js"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let source = "new URL('./x.png', import.meta.url); new URL('./x.png', import.meta.url);";
        assert_eq!(scan(source), vec!["./x.png", "./x.png"]);
    }

    #[test]
    fn test_literal_is_verbatim() {
        let source = r#"new URL("./dir with space/é.svg?v=1", import.meta.url)"#;
        assert_eq!(scan(source), vec!["./dir with space/é.svg?v=1"]);
    }

    #[test]
    fn test_other_call_shapes_are_ignored() {
        let source = r#"
            const a = new URL(base + './a.js', import.meta.url);
            const b = URL('./b.js', import.meta.url);
            const c = new URL('./c.js', import.meta.url, extra);
            const d = renew URL('./d.js', import.meta.url);
        "#;
        assert!(scan(source).is_empty());
    }

    #[test]
    fn test_scanning_twice_is_identical() {
        let scanner = DependencyScanner::new().unwrap();
        let source = "new URL('./a.js', import.meta.url); new URL(\"./b.css\", import.meta.url)";
        let first: Vec<&str> = scanner.scan(source).collect();
        let second: Vec<&str> = scanner.scan(source).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
