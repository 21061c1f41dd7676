// Processors module
pub mod css_processor;
pub mod dependency_scanner;
pub mod import_meta;
pub mod linker;
pub mod minifier;

pub use css_processor::*;
pub use dependency_scanner::*;
pub use import_meta::*;
pub use linker::*;
pub use minifier::*;
