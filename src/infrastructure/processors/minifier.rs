use crate::utils::{Diagnostic, Location};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use super::linker::diagnostics_from_oxc;

/// JavaScript minification using oxc: whitespace, identifiers and syntax
pub struct OxcMinifier {
    options: MinifierOptions,
}

impl OxcMinifier {
    pub fn new() -> Self {
        Self {
            options: MinifierOptions {
                mangle: Some(MangleOptions::default()),
                compress: Some(CompressOptions::default()),
            },
        }
    }

    /// Minify an ES module. `filename` is only used to locate diagnostics.
    pub fn minify(&self, source_code: &str, filename: &str) -> Result<String, Vec<Diagnostic>> {
        let allocator = Allocator::default();
        let parse_result = Parser::new(&allocator, source_code, SourceType::mjs()).parse();

        if !parse_result.errors.is_empty() {
            return Err(diagnostics_from_oxc(&parse_result.errors, filename, source_code));
        }
        if parse_result.panicked {
            return Err(vec![Diagnostic::located(
                Location::new(filename, 1, 0),
                "failed to parse generated bundle",
            )]);
        }

        let mut program = parse_result.program;
        let minified = Minifier::new(self.options.clone()).minify(&allocator, &mut program);

        let codegen_options = CodegenOptions {
            minify: true,
            ..Default::default()
        };

        Ok(Codegen::new()
            .with_options(codegen_options)
            .with_scoping(minified.scoping)
            .build(&program)
            .code)
    }

    /// Estimate size reduction percentage
    pub fn calculate_reduction(&self, original: &str, minified: &str) -> f64 {
        let original_size = original.len() as f64;
        let minified_size = minified.len() as f64;

        if original_size == 0.0 {
            return 0.0;
        }

        ((original_size - minified_size) / original_size) * 100.0
    }
}

impl Default for OxcMinifier {
    fn default() -> Self {
        Self::new()
    }
}
