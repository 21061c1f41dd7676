//! Builds the scripts, stylesheets and images an HTML entry document
//! references and rewrites the document to point at the built files.

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod utils;

pub use crate::core::{AssetPipeline, DuplicatePolicy, PipelineConfig, PipelineReport};
pub use crate::infrastructure::{AssetBuilder, Document, OxcBundleEngine, TargetMap, TokioFileSystemService};
pub use crate::utils::{BuildError, Diagnostic, Location, PackError, Result};
