// HTML document model
pub mod document;
pub mod targets;

pub use document::*;
pub use targets::*;
